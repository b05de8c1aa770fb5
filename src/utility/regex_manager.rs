
use lazy_static::lazy_static;
use cached::proc_macro::cached;
use regex::Regex;


lazy_static! {
    static ref URL_REGEX: Regex = Regex::new(r"(?i)https?://[^\s<>]+").unwrap();
    static ref ID_REGEX: Regex = Regex::new(r"\d{17,20}").unwrap();
}

pub struct RegexManager {}

impl RegexManager {

    pub fn get_url_regex() -> &'static Regex {
        &URL_REGEX
    }

    pub fn get_id_regex() -> &'static Regex {
        &ID_REGEX
    }
}

/// Guild filter patterns are compiled on first use and memoized; an invalid
/// pattern compiles to None and is skipped by the pipeline.
#[cached(size = 128)]
pub fn compile_filter(pattern: String) -> Option<Regex> {
    Regex::new(&pattern).ok()
}


#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn url_regex_hits_links_only() {
        let regex = RegexManager::get_url_regex();
        assert!(regex.is_match("look at https://example.com/page"));
        assert!(regex.is_match("HTTP://EXAMPLE.COM"));
        assert!(!regex.is_match("no links in here"));
    }

    #[test]
    fn invalid_patterns_compile_to_none() {
        assert!(compile_filter(r"free\s+nitro".to_string()).is_some());
        assert!(compile_filter(r"([unclosed".to_string()).is_none());
    }
}
