use std::error::Error;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wxtraffic=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    wxtraffic::apps::run_wxtraffic(std::env::args())
}
