pub mod jobup;
pub mod search;
pub mod webdriver;

pub use webdriver::BrowserSession;
