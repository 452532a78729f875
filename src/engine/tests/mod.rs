//! Engine unit tests, organized by domain.

mod crawl;
