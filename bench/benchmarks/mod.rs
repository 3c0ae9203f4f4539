pub mod titer_queries;
