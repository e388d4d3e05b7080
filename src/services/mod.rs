pub mod articles;
pub mod feed;
pub mod password;
pub mod reactions;
pub mod users;
