//! Church command handlers.

use anyhow::Result;
use pullpay_core::views::Dashboard;

use super::render;

pub async fn list(dashboard: &Dashboard) -> Result<()> {
    render(dashboard.load_churches().await, |churches| {
        if churches.is_empty() {
            println!("No churches found.");
        }
        for church in churches {
            println!("{:>4}  {}", church.id, church.name);
        }
    })
}
