/// Console banners and status lines for the seeding run

use colored::Colorize;

const WIDTH: usize = 80;

pub fn header(title: &str) {
    println!("{}", "=".repeat(WIDTH).cyan());
    println!("{}", title.bold().cyan());
    println!("{}", "=".repeat(WIDTH).cyan());
    println!();
}

pub fn section(title: &str) {
    println!();
    println!("{}", format!("── {} ", title).bold().blue());
    println!("{}", "-".repeat(WIDTH).blue());
}

pub fn footer(success: bool, message: &str) {
    println!();
    println!("{}", "=".repeat(WIDTH).cyan());
    if success {
        println!("{} {}", "✓".green().bold(), message);
    } else {
        println!("{} {}", "✗".red().bold(), message);
    }
    println!("{}", "=".repeat(WIDTH).cyan());
}

pub fn info(message: &str) {
    println!("{} {}", "ℹ".blue(), message);
}

pub fn success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

pub fn warn(message: &str) {
    println!("{} {}", "⚠".yellow(), message);
}
