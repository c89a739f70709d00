mod batch;
mod health;
mod url;
mod user;

pub use batch::create_batch;
pub use health::ping;
pub use url::{create_url_json, create_url_text, redirect};
pub use user::{delete_user_urls, list_user_urls};
