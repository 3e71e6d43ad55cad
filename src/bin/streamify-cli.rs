// src/bin/streamify-cli.rs

//! Database maintenance: `seed` fills a development database with onboarded
//! users and friend requests, `drop` empties it.

use std::{sync::Arc, time::Duration};

use clap::{Parser, Subcommand};
use rand::{Rng, seq::SliceRandom};
use sqlx::postgres::PgPoolOptions;
use streamify::{
    chat::{ChatProvider, ChatUser, DisabledChat, StreamChat},
    config::StreamConfig,
    models::{
        friend_request::NewFriendRequest,
        user::{NewUser, User, random_avatar},
    },
    store::{PgStore, Store},
    utils::hash::hash_password,
};

const LANGUAGES: &[&str] = &[
    "English", "Spanish", "French", "German", "Mandarin", "Japanese", "Korean", "Hindi",
    "Russian", "Portuguese", "Arabic", "Italian", "Turkish", "Dutch",
];

const FIRST_NAMES: &[&str] = &[
    "Ada", "Bruno", "Chiara", "Dmitri", "Elena", "Farid", "Greta", "Hiro", "Ines", "Jonas",
    "Kavya", "Luca", "Mei", "Nadia", "Omar", "Paula", "Quentin", "Rosa", "Sven", "Tomoko",
];

const LAST_NAMES: &[&str] = &[
    "Alvarez", "Berg", "Costa", "Dubois", "Eriksen", "Fischer", "Garcia", "Hayashi", "Ivanova",
    "Jensen", "Kowalski", "Lopez", "Moreau", "Nakamura", "Okafor", "Petrov", "Rossi", "Silva",
];

/// Requests per seeded bucket (sent pending, sent accepted, received pending).
const REQUESTS_PER_BUCKET: usize = 20;

#[derive(Parser, Debug)]
#[command(name = "streamify-cli", version, about = "Streamify database maintenance")]
struct Cli {
    /// Postgres connection string
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    /// Chat service key; chat profiles are only synced when both key and secret are set
    #[arg(long, env = "STREAM_API_KEY")]
    stream_api_key: Option<String>,

    #[arg(long, env = "STREAM_API_SECRET")]
    stream_api_secret: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Insert onboarded users and friend requests around the first one
    Seed {
        /// Number of users to create
        #[arg(long, default_value_t = 100)]
        users: usize,

        /// Password shared by every seeded account
        #[arg(long, default_value = "@Password123")]
        password: String,
    },
    /// Delete every user and friend request
    Drop,
}

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "streamify=info,streamify_cli=info".into()),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&cli.database_url)
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    match cli.command {
        Command::Drop => {
            sqlx::query("TRUNCATE friend_requests, users").execute(&pool).await?;
            tracing::info!("Dropped all users and friend requests");
        }
        Command::Seed { users, password } => {
            let chat: Arc<dyn ChatProvider> = match (cli.stream_api_key, cli.stream_api_secret) {
                (Some(api_key), Some(api_secret)) => {
                    Arc::new(StreamChat::new(&StreamConfig { api_key, api_secret })?)
                }
                _ => Arc::new(DisabledChat),
            };
            let store = PgStore::new(pool, Duration::from_secs(10));
            seed(&store, chat.as_ref(), users, &password).await?;
        }
    }
    Ok(())
}

fn random_language(rng: &mut impl Rng) -> String {
    LANGUAGES.choose(rng).copied().unwrap_or("English").to_string()
}

async fn seed(store: &dyn Store, chat: &dyn ChatProvider, count: usize, password: &str) -> CliResult<()> {
    if count == 0 {
        return Ok(());
    }

    tracing::info!("Begin seeding {} users...", count);
    let password_hash = hash_password(password)?;
    let mut seeded: Vec<User> = Vec::with_capacity(count);

    for i in 0..count {
        let (first, last, native, learning) = {
            let mut rng = rand::thread_rng();
            (
                FIRST_NAMES.choose(&mut rng).copied().unwrap_or("Ada"),
                LAST_NAMES.choose(&mut rng).copied().unwrap_or("Berg"),
                random_language(&mut rng),
                random_language(&mut rng),
            )
        };
        let full_name = format!("{} {}", first, last);
        let created = store
            .insert_user(NewUser {
                full_name: full_name.clone(),
                email: format!("{}.{}.{}@dummy.com", first, last, i).to_lowercase(),
                password_hash: password_hash.clone(),
                profile_pic: random_avatar(),
            })
            .await?;

        let mut user = created;
        user.bio = format!("Hello, I'm {}", full_name);
        user.native_lng = native;
        user.learning_lng = learning;
        user.location = "Some City, Country".to_string();
        user.is_onboarded = true;
        let user = store.update_user(&user).await?;

        chat.upsert_user(&ChatUser::from(&user)).await?;
        seeded.push(user);
    }

    let main = &seeded[0];
    tracing::info!(email = %main.email, password = %password, "Seeded main user {}", main.id);

    tracing::info!("Begin seeding friend requests...");
    let others = &seeded[1..];
    for (i, other) in others.iter().enumerate().take(REQUESTS_PER_BUCKET * 3) {
        let bucket = i / REQUESTS_PER_BUCKET;
        let (sender_id, recipient_id) = if bucket == 2 {
            (other.id, main.id)
        } else {
            (main.id, other.id)
        };
        let request = store
            .create_request(NewFriendRequest { sender_id, recipient_id })
            .await?;
        if bucket == 1 {
            store.accept_friend_request(&request).await?;
        }
    }

    tracing::info!("Seeded {} users", seeded.len());
    Ok(())
}
