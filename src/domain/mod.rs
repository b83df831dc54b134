pub mod post;
pub mod publisher;

pub use post::{NewPost, Post, MIN_PUBLISH_DATE};
pub use publisher::Publisher;
