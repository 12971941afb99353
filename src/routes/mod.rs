pub mod books;
pub mod health;
pub mod quotes;
pub mod search;
