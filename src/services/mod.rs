pub mod exchange_rate;
pub mod order_submission;
pub mod payment_simulator;
pub mod pricing;

pub use exchange_rate::{convert, CoinGeckoRateSource, ExchangeRateGateway, RateSource};
pub use order_submission::{
    InMemoryOrderStore, OrderStore, OrderSubmissionGateway, SeaOrmOrderStore,
};
pub use payment_simulator::{final_report, report_header, PaymentSimulator, ProcessSimulator};
pub use pricing::PricingCalculator;
