pub mod batch_service;
pub mod extraction_service;
pub mod price_service;
