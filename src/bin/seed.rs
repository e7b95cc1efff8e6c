use clap::Parser;
use mediashelf::{
    domain::{CreateUserRequest, MediaType, Role, SaveMediaRequest},
    repository::{
        CategoryRepository, SqliteCategoryRepository,
        MediaRepository, SqliteMediaRepository,
        UserRepository, SqliteUserRepository,
    },
};
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};

/// Fill a database with demo accounts and a small catalog.
#[derive(Parser, Debug)]
#[command(name = "seed")]
struct Args {
    /// Database to seed
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://mediashelf.db?mode=rwc")]
    database_url: String,

    /// Delete all existing data first
    #[arg(long)]
    reset: bool,
}

const SAMPLE_PDF: &str = "https://www.africau.edu/images/default/sample.pdf";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    println!("🌱 Starting database seeding...");

    let db_pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&args.database_url)
        .await?;

    println!("📋 Running migrations...");
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await?;

    if args.reset {
        println!("🧹 Clearing existing data...");
        reset(&db_pool).await?;
    }

    let user_repo = SqliteUserRepository::new(db_pool.clone());
    let media_repo = SqliteMediaRepository::new(db_pool.clone());
    let category_repo = SqliteCategoryRepository::new(db_pool.clone());

    if user_repo.find_by_email("demo@app.com").await?.is_some() {
        println!("Database already seeded, pass --reset to start over.");
        return Ok(());
    }

    println!("👥 Creating users...");
    for (name, email, role) in [
        ("Demo User", "demo@app.com", Role::User),
        ("Admin User", "admin@app.com", Role::Admin),
    ] {
        user_repo.create(CreateUserRequest {
            name: name.to_string(),
            email: email.to_string(),
            password: "password".to_string(),
            role,
        }).await?;
    }

    println!("🏷️  Creating categories...");
    for name in ["Action", "Sci-Fi", "Drama", "Classics"] {
        category_repo.create(name).await?;
    }

    println!("📚 Creating media...");
    let catalog = [
        ("The Fault in Our Stars", "John Green - The Fault in Our Stars", MediaType::Book, &["Action", "Sci-Fi"][..]),
        ("Jungle Book", "Rudyard Kipling - Jungle Book", MediaType::Book, &["Action", "Sci-Fi"][..]),
        ("Good Omens", "Neil Gaiman - Good Omens", MediaType::Book, &["Action", "Sci-Fi"][..]),
        ("The Martian", "Andy Weir - The Martian", MediaType::Book, &["Action", "Sci-Fi"][..]),
        ("Metropolis", "Fritz Lang - Metropolis", MediaType::Movie, &["Sci-Fi", "Classics"][..]),
        ("Kind of Blue", "Miles Davis - Kind of Blue", MediaType::Music, &["Classics"][..]),
    ];
    for (title, description, media_type, categories) in catalog {
        media_repo.create(SaveMediaRequest {
            title: title.to_string(),
            description: description.to_string(),
            link: SAMPLE_PDF.to_string(),
            media_type,
            categories: categories.iter().map(|c| c.to_string()).collect(),
            rent_per_day_cents: 300,
        }).await?;
    }
    println!("  ✅ Created {} media items", catalog.len());

    println!("\n✨ Database seeding complete!");
    println!("\n📝 Test credentials:");
    println!("  User:  demo@app.com / password");
    println!("  Admin: admin@app.com / password");

    Ok(())
}

async fn reset(pool: &SqlitePool) -> anyhow::Result<()> {
    for table in [
        "payment_allocations",
        "payments",
        "links",
        "transactions",
        "csrf_tokens",
        "sessions",
        "media",
        "categories",
        "users",
    ] {
        sqlx::query(&format!("DELETE FROM {}", table))
            .execute(pool)
            .await?;
    }
    Ok(())
}
