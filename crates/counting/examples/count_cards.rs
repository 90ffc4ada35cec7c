use counting::{Session, SessionConfig};
use image::{Rgb, RgbImage};
use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    println!("🃏 Card Counting Example");

    // Compose a stand-in crowd photo: gray background, three green cards,
    // two pink cards
    let mut photo = RgbImage::from_pixel(320, 240, Rgb([110, 110, 115]));
    let green = Rgb([30, 190, 40]);
    let pink = Rgb([245, 90, 170]);
    for (x, y, w, h, color) in [
        (30, 40, 40, 55, green),
        (120, 60, 35, 50, green),
        (250, 150, 45, 60, green),
        (80, 150, 40, 55, pink),
        (200, 30, 35, 50, pink),
    ] {
        for dy in 0..h {
            for dx in 0..w {
                photo.put_pixel(x + dx, y + dy, color);
            }
        }
    }

    let dir = std::env::temp_dir().join("count_cards_example");
    std::fs::create_dir_all(&dir)?;
    let photo_path = dir.join("crowd.png");
    photo.save(&photo_path)?;
    println!("   Wrote demo photo to {}", photo_path.display());

    // Session configuration: two classes, photo kept at its native size
    let mut config = SessionConfig::default();
    config.classes = vec!["green".to_string(), "pink".to_string()];
    config.size_limit = 320;
    config.size_filter = 10.0;

    let mut session = Session::open(&photo_path, config)?;

    // Teach one sample card per class; flood fill does the rest
    println!("\n🎨 Training from one pick per class");
    session.train_class("green")?;
    session.pick(50, 60);
    session.train_class("pink")?;
    session.pick(100, 170);
    session.train()?;

    let palette = session.palette().expect("palette was just trained");
    println!("   Trained a palette of {} entries", palette.len());

    // Classify every pixel and count connected card regions
    println!("\n🔢 Counting");
    let report = session.count()?;
    for class in &report.classes {
        println!("   {}: {} cards", class.name, class.count);
    }
    println!("   Total: {} cards", report.total());

    let diff_path = dir.join("diff.png");
    report.diff.save(&diff_path)?;
    session.save();

    println!("\n✅ Counting completed!");
    println!("   Diff visualization: {}", diff_path.display());
    println!("\nNote: picks, masks and the palette are cached next to the photo,");
    println!("      so a reopened session could count without retraining.");

    Ok(())
}
