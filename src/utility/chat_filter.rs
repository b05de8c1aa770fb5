
use crate::utility::guild_config::GuildConfig;
use crate::utility::rate_limiter::RateLimiter;
use crate::utility::regex_manager::{self, RegexManager};
use crate::utility::mixed::caps_ratio;
use crate::utility::traits::Singleton;
use crate::impl_singleton;


const CAPS_MINIMUM_LENGTH: usize = 12;

#[derive(Debug, Clone, PartialEq)]
pub enum FilterType {
    Spam,
    Profanity,
    Regex(String),
    Link,
    Caps,
    Fine,
}

impl FilterType {
    pub fn to_string(&self) -> String {
        match self {
            FilterType::Spam => "spam".to_string(),
            FilterType::Profanity => "profanity".to_string(),
            FilterType::Regex(pattern) => format!("regex:{}", pattern),
            FilterType::Link => "links".to_string(),
            FilterType::Caps => "caps".to_string(),
            FilterType::Fine => "fine".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub filter_type: FilterType,
    pub context: String,
}

impl Filter {

    fn fine() -> Filter {
        Filter {
            filter_type: FilterType::Fine,
            context: String::new(),
        }
    }

    pub fn is_fine(&self) -> bool {
        self.filter_type == FilterType::Fine
    }
}

/// Ordered, short-circuiting rule pipeline. Exemption is checked before
/// anything else so privileged senders never feed the rate limiter; spam is
/// the cheapest and most urgent check; content-destructive rules (profanity,
/// regex) pre-empt the cosmetic caps rule. First match wins.
pub struct ChatFilter {
    profanity: Vec<String>,
    allowed_domains: Vec<String>,
}

impl ChatFilter {

    pub fn new() -> ChatFilter {
        ChatFilter {
            profanity: vec![
                "fuck",
                "shit",
                "bitch",
                "bastard",
                "asshole",
                "dickhead",
                "cunt",
                "whore",
                "slut",
                "wanker",
                "prick",
                "douchebag"
            ].into_iter().map(|word| word.to_string()).collect(),
            allowed_domains: vec![
                "tenor.com",
                "giphy.com",
                "discord.com",
                "spotify.com",
                "spotify.link"
            ].into_iter().map(|domain| domain.to_string()).collect(),
        }
    }

    pub async fn apply(&self, config: &GuildConfig, author_id: u64, content: &str,
                       exempt: bool, now: i64) -> Filter {

        if exempt {
            return Filter::fine();
        }

        let spam = RateLimiter::get_instance().lock().await
            .record_and_check(config.guild_id, author_id, now,
                              config.spam_messages, config.spam_window);
        if spam {
            return Filter {
                filter_type: FilterType::Spam,
                context: String::new(),
            };
        }

        let lowered = content.to_lowercase();
        if config.profanity_filter {
            for word in self.profanity.iter().chain(config.custom_words.iter()) {
                if lowered.contains(word.as_str()) {
                    return Filter {
                        filter_type: FilterType::Profanity,
                        context: word.to_string(),
                    };
                }
            }
        }

        for pattern in config.regex_filters.iter() {
            let compiled = regex_manager::compile_filter(format!("(?i){}", pattern));
            if let Some(regex) = compiled {
                if let Some(hit) = regex.find(content) {
                    return Filter {
                        filter_type: FilterType::Regex(pattern.to_string()),
                        context: hit.as_str().to_string(),
                    };
                }
            }
        }

        if config.link_filter {
            for hit in RegexManager::get_url_regex().find_iter(content) {
                if self.is_external(hit.as_str()) {
                    return Filter {
                        filter_type: FilterType::Link,
                        context: hit.as_str().to_string(),
                    };
                }
            }
        }

        if content.chars().count() >= CAPS_MINIMUM_LENGTH
            && caps_ratio(content) > config.caps_threshold {
            return Filter {
                filter_type: FilterType::Caps,
                context: content.to_string(),
            };
        }

        Filter::fine()
    }

    fn is_external(&self, url: &str) -> bool {
        let domain = url.split("://").nth(1).unwrap_or(url);
        let domain = domain.split(['/', '?', '#', ':']).next().unwrap_or(domain);
        let normalized = idna::domain_to_ascii(domain)
            .unwrap_or_else(|_| domain.to_lowercase());
        !self.allowed_domains.iter().any(|allowed| {
            normalized == *allowed || normalized.ends_with(&format!(".{}", allowed))
        })
    }
}

impl_singleton!(ChatFilter);
