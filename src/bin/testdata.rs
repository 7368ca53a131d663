//! Seeds a demo event and runs it through a full judging cycle, printing
//! the resulting leaderboard, progress report and bias report as JSON.

use clap::Parser;
use gavel::{
    events::{EventStatus, transition_status},
    judging::{assignment, progress, queue, reviews, scoring},
    store::{
        EntityStore,
        sqlite::{SqliteStore, open_pool},
    },
};
use indexmap::IndexMap;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use uuid::Uuid;

#[derive(Parser)]
struct Seed {
    database_url: Option<String>,
    #[clap(long, default_value_t = 8)]
    submissions: usize,
    #[clap(long, default_value_t = 4)]
    judges: usize,
    #[clap(long, default_value_t = 2)]
    judges_per_submission: i64,
}

fn main() {
    tracing_subscriber::fmt().init();

    let args = Seed::parse();
    let db_url = args
        .database_url
        .or_else(|| std::env::var("DATABASE_URL").ok())
        .unwrap_or_else(|| ":memory:".to_string());

    let pool = open_pool(&db_url).unwrap();
    let mut store = SqliteStore::new(&pool).unwrap();
    store.run_migrations().unwrap();

    let event = store
        .create_event("Demo Hackathon", args.judges_per_submission)
        .unwrap();

    for (i, (name, scale_min, scale_max, weight)) in [
        ("Innovation", 0, 10, 2.0),
        ("Execution", 0, 10, 1.5),
        ("Presentation", 1, 5, 1.0),
    ]
    .into_iter()
    .enumerate()
    {
        store
            .add_criterion(
                &event.id, name, scale_min, scale_max, weight, i as i64,
            )
            .unwrap();
    }

    for i in 0..args.judges {
        store
            .add_event_judge(
                &event.id,
                &Uuid::new_v4().to_string(),
                &format!("Judge {i}"),
            )
            .unwrap();
    }

    for i in 0..args.submissions {
        store
            .add_submission(
                &event.id,
                &Uuid::new_v4().to_string(),
                &serde_json::json!({
                    "project_name": format!("Project {i}"),
                    "repo": format!("https://example.com/project-{i}"),
                }),
            )
            .unwrap();
    }

    transition_status(&mut store, &event.id, EventStatus::Open).unwrap();

    let set = assignment::assign_judges(&mut store, None, &event.id).unwrap();
    println!(
        "assigned {} judge/submission pairs via {}",
        set.assignments.len(),
        set.strategy
    );

    transition_status(&mut store, &event.id, EventStatus::Judging).unwrap();

    let mut rng = ChaCha20Rng::from_os_rng();
    let judges = store.list_event_judges(&event.id).unwrap();
    let criteria = store.list_criteria(&event.id).unwrap();

    for judge in &judges {
        let judge_queue =
            queue::judge_queue(&mut store, &judge.judge_id, &event.id)
                .unwrap();
        for item in &judge_queue.items {
            let scores: IndexMap<String, f32> = criteria
                .iter()
                .map(|criterion| {
                    let score = rng.random_range(
                        criterion.scale_min..=criterion.scale_max,
                    );
                    (criterion.id.clone(), score as f32)
                })
                .collect();
            reviews::submit_review(
                &mut store,
                &judge.judge_id,
                &item.submission.id,
                scores,
                Some(format!("seeded by {}", judge.name)),
            )
            .unwrap();
        }
    }

    let leaderboard = scoring::event_leaderboard(&mut store, &event.id).unwrap();
    let report = progress::event_progress(&mut store, &event.id).unwrap();
    let bias = scoring::bias::event_bias_report(&mut store, &event.id).unwrap();

    println!("{}", serde_json::to_string_pretty(&leaderboard).unwrap());
    println!("{}", serde_json::to_string_pretty(&report).unwrap());
    println!("{}", serde_json::to_string_pretty(&bias).unwrap());
}
