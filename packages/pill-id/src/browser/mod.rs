//! Browser implementations.

pub mod webdriver;

pub use webdriver::{WebDriverLauncher, WebDriverSession};
