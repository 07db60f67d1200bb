//! Command implementations. Each prints its output to `stdout`.

use std::io::Write as _;
use std::sync::Arc;

use color_eyre::eyre::{bail, eyre};
use election_api_client::Client;
use election_types::admin::{
    AddCandidateRequest, AdjustVotesRequest, AdminCredentials, CreateUserRequest,
    DeleteCandidateRequest, SetElectionRequest,
};
use election_types::display::DisplayZone;
use election_types::status::{ElectionId, StatusKind};
use election_types::voting::{ActionResponse, CandidateId, CastVoteRequest, PositionId, User};
use time::{
    format_description::well_known::Rfc3339, macros::format_description, OffsetDateTime,
    PrimitiveDateTime,
};

use crate::cache::ResultCache;
use crate::clock::{SharedClock, SystemClock};
use crate::config::{AdminArgs, AdminCommand, Command, Config};
use crate::error::Error;
use crate::phase::{resolve, ResolvedPhase};
use crate::render;
use crate::results::validated_results;
use crate::session::Session;
use crate::store::{FileStore, SharedStore};
use crate::watcher::ElectionWatcher;

struct Context {
    config: Config,
    client: Client,
    cache: ResultCache,
    session: Session,
    clock: SharedClock,
}

pub(crate) async fn run(config: Config) -> color_eyre::Result<()> {
    let file_store = FileStore::open(&config.state_file)?;
    tracing::debug!("using state file {}", file_store.path().display());
    let store: SharedStore = Arc::new(file_store);
    let context = Context {
        client: Client::new(config.api_url.clone()),
        cache: ResultCache::new(Arc::clone(&store)),
        session: Session::new(store),
        clock: Arc::new(SystemClock),
        config,
    };
    tracing::debug!("using election service at {}", context.client.base_url());

    match context.config.command.clone() {
        Command::Watch => watch(&context).await,
        Command::Status => status(&context).await,
        Command::Results => results(&context).await,
        Command::Signin { email, password } => signin(&context, &email, &password).await,
        Command::Logout => logout(&context),
        Command::Whoami => whoami(&context),
        Command::Positions => positions(&context).await,
        Command::Candidates { position_id } => candidates(&context, position_id).await,
        Command::Vote {
            position_id,
            candidate_id,
        } => vote(&context, position_id, candidate_id).await,
        Command::MyVotes => my_votes(&context).await,
        Command::Admin(args) => admin(&context, args).await,
    }
}

async fn watch(context: &Context) -> color_eyre::Result<()> {
    let watcher = ElectionWatcher::start(
        Arc::new(context.client.clone()),
        context.cache.clone(),
        Arc::clone(&context.clock),
        context.config.poll_interval(),
    );
    let mut phase_rx = watcher.subscribe_phase();
    let mut remaining_rx = watcher.subscribe_remaining();
    let zone = context.config.display_zone;
    let mut stdout = std::io::stdout();
    let mut last_kind = None;

    println!("Watching the election. Press Ctrl-C to stop.");
    loop {
        tokio::select! {
            changed = phase_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = phase_rx.borrow_and_update().clone();
                if let Some(phase) = &snapshot.phase {
                    println!("\n{}", phase.describe(&zone));
                    if !phase.message().is_empty() {
                        println!("{}", phase.message());
                    }
                    if phase.kind() == StatusKind::Ended && last_kind != Some(StatusKind::Ended) {
                        let results = watcher.get_validated_results().await;
                        print!("\n{}", render::results_report(&results, &zone));
                    }
                    last_kind = Some(phase.kind());
                }
                if let Some(error) = &snapshot.error {
                    println!("{error}");
                }
            }
            changed = remaining_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let remaining = remaining_rx.borrow_and_update().clone();
                if let Some(remaining) = remaining {
                    print!("\r{:<40}", render::remaining_line(&remaining));
                    stdout.flush()?;
                }
            }
            signal = tokio::signal::ctrl_c() => {
                signal?;
                println!();
                break;
            }
        }
    }

    watcher.shutdown();
    Ok(())
}

async fn status(context: &Context) -> color_eyre::Result<()> {
    let status = context
        .client
        .get_election_status()
        .await
        .map_err(Error::from)?;
    let resolved = resolve(&status, context.clock.now());
    if let Err(e) = &resolved {
        tracing::warn!("{e}");
    }
    let phase = ResolvedPhase::or_no_election(resolved, &status);

    if let Some(election_id) = phase.election_id() {
        context.cache.observe(election_id)?;
    }
    print!(
        "{}",
        render::status_report(&phase, &context.config.display_zone)
    );
    Ok(())
}

async fn results(context: &Context) -> color_eyre::Result<()> {
    // an unknown election never evicts the cache, so a failed status fetch
    // only means the cache cannot be validated against it
    let observed: Option<ElectionId> = match context.client.get_election_status().await {
        Ok(status) => status.election_id,
        Err(e) => {
            tracing::warn!("failed to fetch election status: {}", Error::from(e));
            None
        }
    };

    let validated = validated_results(
        &context.client,
        &context.cache,
        observed.as_ref(),
        context.clock.now(),
    )
    .await;
    print!(
        "{}",
        render::results_report(&validated, &context.config.display_zone)
    );
    Ok(())
}

async fn signin(context: &Context, email: &str, password: &str) -> color_eyre::Result<()> {
    let response = context
        .client
        .signin(email, password)
        .await
        .map_err(Error::from)?;
    match response.user {
        Some(user) if response.success => {
            context.session.sign_in(&user)?;
            println!("Signed in as {}", render::user_line(&user));
            Ok(())
        }
        _ => bail!(
            "{}",
            response.message.as_deref().unwrap_or("Invalid email or password")
        ),
    }
}

fn logout(context: &Context) -> color_eyre::Result<()> {
    context.session.sign_out()?;
    context.cache.clear()?;
    println!("Signed out");
    Ok(())
}

fn whoami(context: &Context) -> color_eyre::Result<()> {
    match context.session.current_user()? {
        Some(user) => println!("{}", render::user_line(&user)),
        None => println!("Not signed in"),
    }
    Ok(())
}

async fn positions(context: &Context) -> color_eyre::Result<()> {
    let positions = context.client.get_positions().await.map_err(Error::from)?;
    print!("{}", render::positions_list(&positions));
    Ok(())
}

async fn candidates(context: &Context, position_id: PositionId) -> color_eyre::Result<()> {
    let candidates = context
        .client
        .get_position_candidates(position_id, false)
        .await
        .map_err(Error::from)?;
    print!("{}", render::candidates_list(&candidates));
    Ok(())
}

fn signed_in_user(context: &Context) -> color_eyre::Result<User> {
    context
        .session
        .current_user()?
        .ok_or_else(|| eyre!("Not signed in. Run `election-terminal signin` first."))
}

async fn vote(
    context: &Context,
    position_id: PositionId,
    candidate_id: CandidateId,
) -> color_eyre::Result<()> {
    let user = signed_in_user(context)?;

    let status = context
        .client
        .get_election_status()
        .await
        .map_err(Error::from)?;
    let phase = resolve(&status, context.clock.now()).map_err(Error::from)?;
    if !phase.is_voting_open() {
        bail!(
            "Voting is not open. {}",
            phase.describe(&context.config.display_zone)
        );
    }

    let votes = context
        .client
        .get_user_votes(user.id)
        .await
        .map_err(Error::from)?;
    if votes.candidate_for(position_id).is_some() {
        bail!("You have already voted for this position");
    }

    let response = context
        .client
        .cast_vote(&CastVoteRequest {
            user_id: user.id,
            position_id,
            candidate_id,
        })
        .await
        .map_err(Error::from)?;
    println!("{}", ensure_success(&response, "Vote recorded", "Failed to cast vote")?);
    Ok(())
}

async fn my_votes(context: &Context) -> color_eyre::Result<()> {
    let user = signed_in_user(context)?;
    let positions = context.client.get_positions().await.map_err(Error::from)?;
    let votes = context
        .client
        .get_user_votes(user.id)
        .await
        .map_err(Error::from)?;
    print!("{}", render::vote_progress(&positions, &votes));
    Ok(())
}

async fn admin(context: &Context, args: AdminArgs) -> color_eyre::Result<()> {
    let credentials = args.credentials();
    let client = &context.client;

    match args.command {
        AdminCommand::Login => {
            let response = client.admin_login(&credentials).await.map_err(Error::from)?;
            println!(
                "{}",
                ensure_success(&response, "Admin credentials accepted", "Invalid admin credentials")?
            );
        }
        AdminCommand::CreateUser {
            email,
            password,
            name,
        } => {
            let response = client
                .create_user(&CreateUserRequest {
                    credentials,
                    email,
                    password,
                    name,
                })
                .await
                .map_err(Error::from)?;
            println!(
                "{}",
                ensure_success(&response, "User created", "Failed to create user")?
            );
        }
        AdminCommand::AddCandidate {
            position,
            name,
            image,
        } => {
            let response = client
                .add_candidate(&AddCandidateRequest {
                    credentials,
                    position_id: position,
                    name,
                    image,
                })
                .await
                .map_err(Error::from)?;
            println!(
                "{}",
                ensure_success(&response, "Candidate added", "Failed to add candidate")?
            );
        }
        AdminCommand::DeleteCandidate { candidate_id } => {
            let response = client
                .delete_candidate(&DeleteCandidateRequest {
                    credentials,
                    candidate_id,
                })
                .await
                .map_err(Error::from)?;
            println!(
                "{}",
                ensure_success(&response, "Candidate deleted", "Failed to delete candidate")?
            );
        }
        AdminCommand::AdjustVotes {
            candidate_id,
            amount,
        } => {
            let response = client
                .adjust_votes(&AdjustVotesRequest {
                    credentials,
                    candidate_id,
                    amount,
                })
                .await
                .map_err(Error::from)?;
            if !response.success {
                bail!(
                    "{}",
                    response.message.as_deref().unwrap_or("Failed to adjust votes")
                );
            }
            match response.votes {
                Some(votes) => println!("Candidate {candidate_id} now has {votes} votes"),
                None => println!("Votes adjusted"),
            }
        }
        AdminCommand::SetElection {
            name,
            start_at,
            end_at,
            reset_data,
        } => {
            let request = set_election_request(
                credentials,
                name,
                &start_at,
                &end_at,
                reset_data,
                &context.config.display_zone,
            )?;
            let response = client.set_election(&request).await.map_err(Error::from)?;
            println!(
                "{}",
                ensure_success(&response, "Election scheduled", "Failed to set election")?
            );
        }
        AdminCommand::Candidates => {
            let candidates = client
                .get_admin_candidates(&credentials)
                .await
                .map_err(Error::from)?;
            print!("{}", render::admin_candidates(&candidates));
        }
    }

    Ok(())
}

/// The service's message for a successful action, or an error carrying its
/// refusal.
fn ensure_success(
    response: &ActionResponse,
    success: &str,
    failure: &str,
) -> color_eyre::Result<String> {
    if response.success {
        Ok(response.message_or(success).to_owned())
    } else {
        Err(eyre!("{}", response.message_or(failure)))
    }
}

fn set_election_request(
    credentials: AdminCredentials,
    name: String,
    start_at: &str,
    end_at: &str,
    reset_data: bool,
    zone: &DisplayZone,
) -> color_eyre::Result<SetElectionRequest> {
    if name.trim().is_empty() {
        bail!("Election name must not be empty");
    }
    let start_at = parse_schedule_time(start_at, zone)?;
    let end_at = parse_schedule_time(end_at, zone)?;
    if end_at <= start_at {
        bail!("End time must be after start time");
    }

    Ok(SetElectionRequest {
        credentials,
        name,
        start_at,
        end_at,
        reset_data,
    })
}

/// Parses an RFC 3339 time, or a time without an offset (as entered in a
/// date-time picker) read in the display zone. Returns UTC.
fn parse_schedule_time(value: &str, zone: &DisplayZone) -> color_eyre::Result<OffsetDateTime> {
    let value = value.trim();
    if let Ok(instant) = OffsetDateTime::parse(value, &Rfc3339) {
        return Ok(instant.to_offset(time::UtcOffset::UTC));
    }

    let local = PrimitiveDateTime::parse(
        value,
        format_description!("[year]-[month]-[day]T[hour]:[minute][optional [:[second]]]"),
    )
    .map_err(|e| eyre!("invalid time {value:?}: {e}; expected e.g. 2025-03-01T08:00"))?;
    Ok(local
        .assume_offset(zone.offset())
        .to_offset(time::UtcOffset::UTC))
}
