pub mod chrome;
pub mod cookies;
pub mod driver;
pub mod health;
pub mod session;

pub use chrome::ChromeDriver;
pub use cookies::{CookieRecord, CookieStore};
pub use driver::Driver;
pub use health::HealthMonitor;
pub use session::{Session, SessionLifecycle};
