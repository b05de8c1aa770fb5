
use serenity::builder::{CreateEmbed, CreateMessage};


pub trait Singleton: Sized {
    fn get_instance() -> &'static tokio::sync::Mutex<Self>;
    fn new() -> Self;
}

#[macro_export]
macro_rules! impl_singleton {
    ($t:ty) => {
        impl $crate::utility::traits::Singleton for $t {
            fn get_instance() -> &'static tokio::sync::Mutex<Self> {
                static INSTANCE: once_cell::sync::Lazy<std::sync::Arc<tokio::sync::Mutex<$t>>> =
                    once_cell::sync::Lazy::new(|| std::sync::Arc::new(tokio::sync::Mutex::new(<$t>::new())));
                &INSTANCE
            }

            fn new() -> Self {
                <$t>::new()
            }
        }
    };
}


pub trait ToMessage {
    fn to_message(&self) -> CreateMessage;
}
impl ToMessage for &str {
    fn to_message(&self) -> CreateMessage {
        CreateMessage::default().content(self.to_string())
    }
}
impl ToMessage for String {
    fn to_message(&self) -> CreateMessage {
        CreateMessage::default().content(self.to_string())
    }
}
impl ToMessage for CreateEmbed {
    fn to_message(&self) -> CreateMessage {
        CreateMessage::default().embed(self.clone())
    }
}
impl ToMessage for CreateMessage {
    fn to_message(&self) -> CreateMessage {
        self.clone()
    }
}
