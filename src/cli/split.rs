//! Split command implementation

use crate::display::split_price;
use clap::Args;
use rust_decimal::Decimal;
use std::str::FromStr;

#[derive(Args, Debug)]
pub struct SplitArgs {
    /// Price to split, e.g. 115055.3149
    pub price: String,

    /// Print the segments as JSON
    #[arg(long)]
    pub json: bool,
}

impl SplitArgs {
    pub fn execute(&self) -> anyhow::Result<()> {
        // Unparseable input shows the fallback, same as a bad tick would
        let price = Decimal::from_str(self.price.trim()).ok();
        let segments = split_price(price);

        if self.json {
            println!("{}", serde_json::to_string(&segments)?);
        } else {
            println!(
                "left={:?} middle={:?} right={:?}",
                segments.left, segments.middle, segments.right
            );
        }
        Ok(())
    }
}
