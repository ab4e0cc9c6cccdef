mod go_spider;
mod index_parser;
mod link_table;
mod page_analyzer;
mod page_fetching;
mod page_parser;
mod url_data_proc;
pub use go_spider::*;
pub use index_parser::*;
pub use link_table::*;
pub use page_analyzer::*;
pub use page_fetching::*;
pub use page_parser::*;
pub use url_data_proc::*;
