mod price_record;

pub use price_record::{PriceQuote, PriceRecord, PriceTotals};
