//! Seed tool
//!
//! Creates the administrator, a regular test user, and a starter question
//! bank. Safe to re-run: existing users are skipped and questions are only
//! loaded into an empty bank.
//!
//! Run with: cargo run --bin seed

use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;

use aptitude_ledger::domain::{NewQuestion, OptionTag, Role};
use aptitude_ledger::handlers::{CreateUserCommand, UserDirectory};
use aptitude_ledger::question_store::QuestionStore;
use aptitude_ledger::{db, AppError};

struct StarterQuestion {
    text: &'static str,
    options: [&'static str; 4],
    answer: OptionTag,
    difficulty: i32,
}

const STARTER_QUESTIONS: &[StarterQuestion] = &[
    StarterQuestion {
        text: "If 2 + 3 = 10, 7 + 2 = 63, 6 + 5 = 66, then 8 + 4 = ?",
        options: ["96", "32", "12", "108"],
        answer: OptionTag::A,
        difficulty: 2,
    },
    StarterQuestion {
        text: "What comes next in the sequence 2, 6, 12, 20, 30, ?",
        options: ["40", "42", "38", "44"],
        answer: OptionTag::B,
        difficulty: 2,
    },
    StarterQuestion {
        text: "Which number does not belong: 3, 5, 7, 9, 11?",
        options: ["3", "5", "9", "11"],
        answer: OptionTag::C,
        difficulty: 1,
    },
    StarterQuestion {
        text: "Book is to reading as fork is to ?",
        options: ["drawing", "writing", "stirring", "eating"],
        answer: OptionTag::D,
        difficulty: 1,
    },
    StarterQuestion {
        text: "What comes next in the sequence 1, 1, 2, 3, 5, 8, ?",
        options: ["11", "12", "13", "15"],
        answer: OptionTag::C,
        difficulty: 1,
    },
    StarterQuestion {
        text: "A clock shows 3:15. What is the angle between the hour and minute hands?",
        options: ["0 degrees", "7.5 degrees", "15 degrees", "22.5 degrees"],
        answer: OptionTag::B,
        difficulty: 3,
    },
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("DATABASE_URL")?;

    println!("Seeding database...");

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await?;

    db::run_migrations(&pool).await?;

    let users = UserDirectory::new(pool.clone());
    let accounts = [
        CreateUserCommand::new("admin".to_string(), "admin@example.com".to_string())
            .with_role(Role::Admin)
            .with_initial_balance(Decimal::new(100_000, 2)),
        CreateUserCommand::new("testuser".to_string(), "user@example.com".to_string())
            .with_initial_balance(Decimal::new(10_000, 2)),
    ];

    for command in accounts {
        let username = command.username.clone();
        match users.create_user(command).await {
            Ok(created) => println!("Created {} user {} ({})", created.role, username, created.user_id),
            Err(AppError::InvalidRequest(_)) => println!("User {} already exists, skipping", username),
            Err(e) => return Err(e.into()),
        }
    }

    let store = QuestionStore::new(pool.clone());
    if store.count().await? == 0 {
        for question in STARTER_QUESTIONS {
            store
                .insert(NewQuestion {
                    question_text: question.text.to_string(),
                    options: question.options.map(str::to_string),
                    correct_answer: question.answer,
                    image_url: None,
                    difficulty: question.difficulty,
                })
                .await?;
        }
        println!("Inserted {} questions", STARTER_QUESTIONS.len());
    } else {
        println!("Question bank already populated, skipping");
    }

    pool.close().await;
    println!("Seeding completed");

    Ok(())
}
