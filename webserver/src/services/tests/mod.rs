//! Service tests for webserver

mod sweeper;
