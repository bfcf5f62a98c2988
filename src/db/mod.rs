pub mod price_record_queries;
