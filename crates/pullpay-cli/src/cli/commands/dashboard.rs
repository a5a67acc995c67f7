//! Dashboard overview.

use anyhow::Result;
use pullpay_core::models::UserProfile;
use pullpay_core::views::Dashboard;

use super::render;

pub async fn show(dashboard: &Dashboard) -> Result<()> {
    render(dashboard.load_overview().await, |user| print_overview(&user))
}

fn print_overview(user: &UserProfile) {
    println!("Welcome, {}", user.full_name());
    println!("Email: {}", user.email);
    println!();
    println!("Your churches:");
    if user.churches.is_empty() {
        println!("  No churches associated.");
    } else {
        for church in &user.churches {
            println!("  {}", church.name);
        }
    }
}
