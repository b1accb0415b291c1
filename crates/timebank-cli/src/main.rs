// SPDX-License-Identifier: Apache-2.0

use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;
use std::path::PathBuf;
use std::process::ExitCode as ProcessExitCode;
use timebank_core::password::{hash_password, DEFAULT_ITERATIONS, MIN_ITERATIONS};
use timebank_core::token::{generate_token, token_hash};
use timebank_core::{ExitCode, MachineError};
use timebank_ledger::{next_status, plan_allocation, standing_signal, AllocationPlan, LedgerError};
use timebank_model::{
    check_work_date, parse_note, parse_warn_threshold_pct, parse_work_date, ClientId, ClientName,
    EmailAddress, Hours, PersonName, ProjectId, Role, Timebank, TimebankName, TimebankStatus,
    ValidationError, DEFAULT_WARN_THRESHOLD_PCT,
};
use timebank_notify::{depletion_draft, entry_logged_draft, invite_created_draft, slice_drafts_for_allocation};
use timebank_store::{
    EntryDraft, NewClient, NewInvitation, NewTimebank, NewUser, StatementRow, Store, StoreError,
    StoreErrorCode,
};

#[derive(Parser)]
#[command(name = "timebank")]
#[command(about = "Timebank operations CLI")]
struct Cli {
    /// Machine-readable output; errors become a JSON envelope on stderr.
    #[arg(long, global = true, default_value_t = false)]
    json: bool,
    /// Database file. Defaults to TIMEBANK_DB_PATH, then the data directory.
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database file and bring the schema up to date.
    Init,
    Admin {
        #[command(subcommand)]
        command: AdminCommand,
    },
    /// Issue an invitation and print its one-time token.
    Invite {
        #[arg(long)]
        email: String,
        #[arg(long, value_enum, default_value_t = RoleCli::Member)]
        role: RoleCli,
        /// Client scope; required for manager and member invitations.
        #[arg(long)]
        client: Option<String>,
        /// Issuing admin's email. Defaults to the first active admin.
        #[arg(long)]
        from: Option<String>,
        #[arg(long, default_value_t = 168)]
        ttl_hours: u64,
    },
    Client {
        #[command(subcommand)]
        command: ClientCommand,
    },
    Bank {
        #[command(subcommand)]
        command: BankCommand,
    },
    /// Log hours against a project, splitting across the client's banks.
    Log {
        #[arg(long)]
        project: String,
        /// Email of the person the work belongs to.
        #[arg(long)]
        user: String,
        /// Decimal hours, at most two fractional digits.
        #[arg(long)]
        hours: String,
        /// Work date (YYYY-MM-DD); defaults to today.
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        note: Option<String>,
    },
    /// CSV statement for a client, to stdout or a file.
    Statement {
        #[arg(long)]
        client: String,
        #[arg(long)]
        from: Option<String>,
        #[arg(long)]
        to: Option<String>,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Expire stale sessions and invitations, re-scan bank depletion once.
    Sweep,
    /// Run the HTTP server in the foreground.
    Serve,
    /// Environment and database diagnostics.
    Doctor,
}

#[derive(Subcommand)]
enum AdminCommand {
    /// Bootstrap the first admin account.
    Create {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        password: String,
        /// PBKDF2 work factor for the stored hash.
        #[arg(long, default_value_t = DEFAULT_ITERATIONS)]
        iterations: u32,
    },
}

#[derive(Subcommand)]
enum ClientCommand {
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        contact: String,
        #[arg(long, default_value_t = DEFAULT_WARN_THRESHOLD_PCT)]
        warn_pct: u8,
        #[arg(long, default_value_t = false)]
        notify_on_entry: bool,
    },
    List {
        #[arg(long, default_value_t = false)]
        include_inactive: bool,
    },
}

#[derive(Subcommand)]
enum BankCommand {
    Add {
        #[arg(long)]
        client: String,
        #[arg(long)]
        name: String,
        /// Purchased pool as decimal hours.
        #[arg(long)]
        hours: String,
        /// Purchase date (YYYY-MM-DD); defaults to today.
        #[arg(long)]
        purchased: Option<String>,
    },
    List {
        #[arg(long)]
        client: String,
        #[arg(long, value_enum)]
        status: Option<StatusCli>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum RoleCli {
    Admin,
    Manager,
    Member,
}

impl From<RoleCli> for Role {
    fn from(value: RoleCli) -> Self {
        match value {
            RoleCli::Admin => Role::Admin,
            RoleCli::Manager => Role::Manager,
            RoleCli::Member => Role::Member,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StatusCli {
    Active,
    Exhausted,
    Closed,
}

impl From<StatusCli> for TimebankStatus {
    fn from(value: StatusCli) -> Self {
        match value {
            StatusCli::Active => TimebankStatus::Active,
            StatusCli::Exhausted => TimebankStatus::Exhausted,
            StatusCli::Closed => TimebankStatus::Closed,
        }
    }
}

/// A command failure carrying both the process exit code and the machine
/// envelope `--json` prints.
struct Failure {
    exit: ExitCode,
    error: MachineError,
}

impl Failure {
    fn validation(message: &str) -> Self {
        Self {
            exit: ExitCode::Validation,
            error: MachineError::new("validation_error", message),
        }
    }

    fn dependency(message: &str) -> Self {
        Self {
            exit: ExitCode::DependencyFailure,
            error: MachineError::new("dependency_failure", message),
        }
    }

    fn internal(message: &str) -> Self {
        Self {
            exit: ExitCode::Internal,
            error: MachineError::new("internal_error", message),
        }
    }
}

impl From<ValidationError> for Failure {
    fn from(err: ValidationError) -> Self {
        Self::validation(&err.0)
    }
}

impl From<LedgerError> for Failure {
    fn from(err: LedgerError) -> Self {
        Self::validation(&err.to_string())
    }
}

impl From<StoreError> for Failure {
    fn from(err: StoreError) -> Self {
        let exit = match err.code {
            StoreErrorCode::NotFound | StoreErrorCode::Validation | StoreErrorCode::Conflict => {
                ExitCode::Validation
            }
            StoreErrorCode::Busy | StoreErrorCode::Io => ExitCode::DependencyFailure,
            _ => ExitCode::Internal,
        };
        Self {
            exit,
            error: MachineError::new(err.code.as_str(), &err.message),
        }
    }
}

fn main() -> ProcessExitCode {
    let cli = Cli::parse();
    let machine = cli.json;
    match run(cli) {
        Ok(()) => ProcessExitCode::from(ExitCode::Success as u8),
        Err(failure) => {
            if machine {
                let body = serde_json::to_string_pretty(&failure.error)
                    .unwrap_or_else(|_| failure.error.to_string());
                eprintln!("{body}");
            } else {
                eprintln!("{}", failure.error);
            }
            ProcessExitCode::from(failure.exit as u8)
        }
    }
}

fn run(cli: Cli) -> Result<(), Failure> {
    let db_path = database_path(cli.db.as_deref());
    match cli.command {
        Commands::Init => init(&db_path, cli.json),
        Commands::Admin {
            command:
                AdminCommand::Create {
                    email,
                    name,
                    password,
                    iterations,
                },
        } => admin_create(&open_store(&db_path)?, &email, &name, &password, iterations, cli.json),
        Commands::Invite {
            email,
            role,
            client,
            from,
            ttl_hours,
        } => invite(
            &open_store(&db_path)?,
            &email,
            role.into(),
            client.as_deref(),
            from.as_deref(),
            ttl_hours,
            cli.json,
        ),
        Commands::Client { command } => match command {
            ClientCommand::Add {
                name,
                contact,
                warn_pct,
                notify_on_entry,
            } => client_add(
                &open_store(&db_path)?,
                &name,
                &contact,
                warn_pct,
                notify_on_entry,
                cli.json,
            ),
            ClientCommand::List { include_inactive } => {
                client_list(&open_store(&db_path)?, include_inactive, cli.json)
            }
        },
        Commands::Bank { command } => match command {
            BankCommand::Add {
                client,
                name,
                hours,
                purchased,
            } => bank_add(
                &open_store(&db_path)?,
                &client,
                &name,
                &hours,
                purchased.as_deref(),
                cli.json,
            ),
            BankCommand::List { client, status } => bank_list(
                &open_store(&db_path)?,
                &client,
                status.map(TimebankStatus::from),
                cli.json,
            ),
        },
        Commands::Log {
            project,
            user,
            hours,
            date,
            note,
        } => log_entry(
            &open_store(&db_path)?,
            &project,
            &user,
            &hours,
            date.as_deref(),
            note.as_deref(),
            cli.json,
        ),
        Commands::Statement {
            client,
            from,
            to,
            out,
        } => statement(
            &open_store(&db_path)?,
            &client,
            from.as_deref(),
            to.as_deref(),
            out.as_deref(),
            cli.json,
        ),
        Commands::Sweep => sweep(&open_store(&db_path)?, cli.json),
        Commands::Serve => serve(cli.db.as_deref()),
        Commands::Doctor => doctor(&db_path, cli.json),
    }
}

fn database_path(flag: Option<&std::path::Path>) -> PathBuf {
    if let Some(path) = flag {
        return path.to_path_buf();
    }
    if let Ok(env_path) = std::env::var("TIMEBANK_DB_PATH") {
        let trimmed = env_path.trim();
        if !trimmed.is_empty() {
            return PathBuf::from(trimmed);
        }
    }
    timebank_core::resolve_timebank_data_dir().join("timebank.db")
}

fn open_store(db_path: &std::path::Path) -> Result<Store, Failure> {
    if !db_path.exists() {
        return Err(Failure::dependency(&format!(
            "database {} not found; run `timebank init` first",
            db_path.display()
        )));
    }
    Store::open(db_path).map_err(Failure::from)
}

fn init(db_path: &std::path::Path, machine: bool) -> Result<(), Failure> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            Failure::dependency(&format!(
                "cannot create data directory {}: {e}",
                parent.display()
            ))
        })?;
    }
    let store = Store::open(db_path)?;
    let schema = store.schema_version()?;
    if machine {
        println!(
            "{}",
            json!({"db": db_path.display().to_string(), "schema_version": schema})
        );
    } else {
        println!("database ready: {} (schema v{schema})", db_path.display());
    }
    Ok(())
}

fn admin_create(
    store: &Store,
    email: &str,
    name: &str,
    password: &str,
    iterations: u32,
    machine: bool,
) -> Result<(), Failure> {
    if iterations < MIN_ITERATIONS {
        return Err(Failure::validation(&format!(
            "iterations must be at least {MIN_ITERATIONS}"
        )));
    }
    if store.count_active_admins()? > 0 {
        return Err(Failure::validation(
            "an active admin already exists; invite further admins instead",
        ));
    }
    let new = NewUser {
        email: EmailAddress::parse(email)?,
        name: PersonName::parse(name)?,
        role: Role::Admin,
        client_id: None,
        password_hash: hash_password(password, iterations)
            .map_err(|e| Failure::validation(&e.0))?,
    };
    let user = store.create_user(&new, Utc::now())?;
    if machine {
        println!("{}", json!({"user": user}));
    } else {
        println!("admin created: {} <{}>", user.name, user.email);
        println!("id: {}", user.id);
    }
    Ok(())
}

fn invite(
    store: &Store,
    email: &str,
    role: Role,
    client: Option<&str>,
    from: Option<&str>,
    ttl_hours: u64,
    machine: bool,
) -> Result<(), Failure> {
    let now = Utc::now();
    let client_id = client.map(ClientId::parse).transpose()?;
    let issuer = match from {
        Some(issuer_email) => store
            .find_user_by_email(&EmailAddress::parse(issuer_email)?)?
            .ok_or_else(|| Failure::validation(&format!("no user with email {issuer_email}")))?,
        None => store
            .list_users(None, false, 500)?
            .into_iter()
            .find(|u| u.role == Role::Admin)
            .ok_or_else(|| {
                Failure::validation("no active admin to issue the invitation; run `timebank admin create`")
            })?,
    };
    if issuer.role != Role::Admin || !issuer.active {
        return Err(Failure::validation("invitations can only be issued by an active admin"));
    }

    let ttl = i64::try_from(ttl_hours)
        .ok()
        .filter(|h| *h > 0)
        .ok_or_else(|| Failure::validation("ttl-hours must be a positive number"))?;
    let token = generate_token();
    let new = NewInvitation {
        email: EmailAddress::parse(email)?,
        role,
        client_id,
        token_hash: token_hash(&token),
        invited_by: issuer.id,
        expires_at: now + chrono::Duration::hours(ttl),
    };
    let invitation = store.create_invitation(&new, now)?;

    let client_name = match invitation.client_id {
        Some(id) => Some(store.get_client(&id)?.name.to_string()),
        None => None,
    };
    store.enqueue_notification(
        &invite_created_draft(&invitation, client_name.as_deref()),
        now,
    )?;

    if machine {
        println!("{}", json!({"invitation": invitation, "token": token}));
    } else {
        println!("invitation {} for {} ({})", invitation.id, invitation.email, invitation.role);
        println!("expires: {}", invitation.expires_at);
        println!("token (shown once): {token}");
    }
    Ok(())
}

fn client_add(
    store: &Store,
    name: &str,
    contact: &str,
    warn_pct: u8,
    notify_on_entry: bool,
    machine: bool,
) -> Result<(), Failure> {
    let new = NewClient {
        name: ClientName::parse(name)?,
        contact_email: EmailAddress::parse(contact)?,
        warn_threshold_pct: parse_warn_threshold_pct(warn_pct)?,
        notify_on_entry,
    };
    let created = store.create_client(&new, Utc::now())?;
    if machine {
        println!("{}", json!({"client": created}));
    } else {
        println!("client created: {} ({})", created.name, created.id);
    }
    Ok(())
}

fn client_list(store: &Store, include_inactive: bool, machine: bool) -> Result<(), Failure> {
    let clients = store.list_clients(include_inactive, 500)?;
    if machine {
        println!("{}", json!({"clients": clients}));
        return Ok(());
    }
    for client in &clients {
        println!(
            "{}  {}  contact={}  warn={}%  notify_on_entry={}  active={}",
            client.id,
            client.name,
            client.contact_email,
            client.warn_threshold_pct,
            client.notify_on_entry,
            client.active
        );
    }
    println!("{} client(s)", clients.len());
    Ok(())
}

fn bank_add(
    store: &Store,
    client: &str,
    name: &str,
    hours: &str,
    purchased: Option<&str>,
    machine: bool,
) -> Result<(), Failure> {
    let now = Utc::now();
    let purchased_hours = Hours::parse(hours)?;
    if !purchased_hours.is_positive() {
        return Err(Failure::validation("purchased hours must be positive"));
    }
    let purchased_at = match purchased {
        Some(raw) => parse_work_date(raw)?,
        None => now.date_naive(),
    };
    let new = NewTimebank {
        client_id: ClientId::parse(client)?,
        name: TimebankName::parse(name)?,
        purchased_hours,
        purchased_at,
    };
    let bank = store.create_timebank(&new, now)?;
    if machine {
        println!("{}", json!({"timebank": bank}));
    } else {
        println!(
            "timebank created: {} ({}) purchased={} remaining={}",
            bank.name, bank.id, bank.purchased_hours, bank.remaining_hours
        );
    }
    Ok(())
}

fn bank_list(
    store: &Store,
    client: &str,
    status: Option<TimebankStatus>,
    machine: bool,
) -> Result<(), Failure> {
    let client_id = ClientId::parse(client)?;
    let banks = store.list_timebanks(Some(&client_id), status, 500)?;
    if machine {
        println!("{}", json!({"timebanks": banks}));
        return Ok(());
    }
    for bank in &banks {
        println!(
            "{}  {}  purchased={}  used={}  remaining={}  status={}  purchased_at={}",
            bank.id,
            bank.name,
            bank.purchased_hours,
            bank.used_hours,
            bank.remaining_hours,
            bank.status,
            bank.purchased_at
        );
    }
    println!("{} timebank(s)", banks.len());
    Ok(())
}

/// Banks as they will look after the plan commits, so depletion drafts can
/// be queued in the same transaction as the entries.
fn predict_banks_after(store: &Store, plan: &AllocationPlan) -> Result<Vec<Timebank>, Failure> {
    let mut banks = Vec::with_capacity(plan.slices.len());
    for slice in &plan.slices {
        let mut bank = store.get_timebank(&slice.bank_id)?;
        bank.used_hours += slice.hours;
        bank.remaining_hours = slice.remaining_after;
        bank.status = next_status(bank.status, slice.remaining_after);
        banks.push(bank);
    }
    Ok(banks)
}

fn log_entry(
    store: &Store,
    project: &str,
    user: &str,
    hours: &str,
    date: Option<&str>,
    note: Option<&str>,
    machine: bool,
) -> Result<(), Failure> {
    let now = Utc::now();
    let project = store.get_project(&ProjectId::parse(project)?)?;
    if !project.active {
        return Err(Failure::validation("project is archived"));
    }
    let client = store.get_client(&project.client_id)?;
    if !client.active {
        return Err(Failure::validation("client is archived"));
    }
    let person = store
        .find_user_by_email(&EmailAddress::parse(user)?)?
        .ok_or_else(|| Failure::validation(&format!("no user with email {user}")))?;
    if !person.active {
        return Err(Failure::validation("user account is deactivated"));
    }
    if person.client_id != Some(client.id) {
        return Err(Failure::validation("user does not belong to the project's client"));
    }

    let amount = Hours::parse(hours)?;
    let work_date = match date {
        Some(raw) => parse_work_date(raw)?,
        None => {
            let today = now.date_naive();
            check_work_date(today)?;
            today
        }
    };
    let note = note
        .map(parse_note)
        .transpose()?
        .filter(|n| !n.is_empty());

    let snapshots = store.bank_snapshots(&client.id)?;
    let plan = plan_allocation(amount, &snapshots)?;
    let banks_after = predict_banks_after(store, &plan)?;
    let mut drafts = slice_drafts_for_allocation(&client, &plan, &banks_after);
    if client.notify_on_entry {
        drafts.push(entry_logged_draft(
            &client,
            project.name.as_str(),
            person.name.as_str(),
            work_date,
            plan.total(),
        ));
    }

    let draft = EntryDraft {
        project_id: project.id,
        user_id: person.id,
        work_date,
        note,
    };
    let applied = store.apply_allocation(&client.id, &draft, &plan, &drafts, now)?;

    if machine {
        println!(
            "{}",
            json!({"total": plan.total(), "entries": applied.entries, "timebanks": applied.banks})
        );
        return Ok(());
    }
    println!("logged {} on {} for {}", plan.total(), work_date, person.email);
    for bank in &applied.banks {
        println!(
            "  {}: remaining {} ({})",
            bank.name, bank.remaining_hours, bank.status
        );
    }
    Ok(())
}

fn render_statement_csv(rows: &[StatementRow]) -> Result<String, Failure> {
    let render = || -> Result<String, Box<dyn std::error::Error>> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(["work_date", "project", "person", "bank", "hours", "note"])?;
        let mut total = Hours::ZERO;
        for row in rows {
            total += row.hours;
            writer.write_record([
                row.work_date.to_string().as_str(),
                row.project.as_str(),
                row.person.as_str(),
                row.bank.as_str(),
                row.hours.to_string().as_str(),
                row.note.as_deref().unwrap_or(""),
            ])?;
        }
        writer.write_record(["total", "", "", "", total.to_string().as_str(), ""])?;
        Ok(String::from_utf8(writer.into_inner()?)?)
    };
    render().map_err(|e| Failure::internal(&format!("csv render failed: {e}")))
}

fn statement(
    store: &Store,
    client: &str,
    from: Option<&str>,
    to: Option<&str>,
    out: Option<&std::path::Path>,
    machine: bool,
) -> Result<(), Failure> {
    let client_id = ClientId::parse(client)?;
    let from: Option<NaiveDate> = from.map(parse_work_date).transpose()?;
    let to: Option<NaiveDate> = to.map(parse_work_date).transpose()?;
    if let (Some(from), Some(to)) = (from, to) {
        if from > to {
            return Err(Failure::validation("from must not be after to"));
        }
    }
    let rows = store.statement_rows(&client_id, from, to)?;
    if machine {
        println!("{}", json!({"rows": rows}));
        return Ok(());
    }
    let body = render_statement_csv(&rows)?;
    match out {
        Some(path) => {
            std::fs::write(path, &body)
                .map_err(|e| Failure::dependency(&format!("cannot write {}: {e}", path.display())))?;
            println!("wrote {} row(s) to {}", rows.len(), path.display());
        }
        None => print!("{body}"),
    }
    Ok(())
}

fn sweep(store: &Store, machine: bool) -> Result<(), Failure> {
    let now = Utc::now();
    let sessions = store.sweep_expired_sessions(now)?;
    let invitations = store.expire_stale_invitations(now)?;

    let mut warnings_queued: u64 = 0;
    for row in store.depletion_scan_rows()? {
        let Some(signal) = standing_signal(
            row.bank.purchased_hours,
            row.bank.remaining_hours,
            row.warn_threshold_pct,
        ) else {
            continue;
        };
        let draft = depletion_draft(&row.client_name, &row.contact_email, &row.bank, signal);
        if store.enqueue_notification(&draft, now)?.is_some() {
            warnings_queued += 1;
        }
    }

    if machine {
        println!(
            "{}",
            json!({
                "sessions_swept": sessions,
                "invitations_expired": invitations,
                "depletion_warnings_queued": warnings_queued,
            })
        );
    } else {
        println!("sessions swept: {sessions}");
        println!("invitations expired: {invitations}");
        println!("depletion warnings queued: {warnings_queued}");
    }
    Ok(())
}

fn serve(db_flag: Option<&std::path::Path>) -> Result<(), Failure> {
    if let Some(path) = db_flag {
        std::env::set_var("TIMEBANK_DB_PATH", path);
    }
    timebank_server::runtime::init_tracing();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| Failure::internal(&format!("cannot start runtime: {e}")))?;
    runtime
        .block_on(timebank_server::runtime::run())
        .map_err(|message| Failure::dependency(&message))
}

fn doctor(db_path: &std::path::Path, machine: bool) -> Result<(), Failure> {
    let config = timebank_server::ServerConfig::from_env();
    let data_dir = timebank_core::resolve_timebank_data_dir();
    let db_exists = db_path.exists();

    let mut schema_version: Option<i64> = None;
    let mut clients: Option<usize> = None;
    let mut users: Option<usize> = None;
    let mut store_error: Option<String> = None;
    if db_exists {
        match Store::open(db_path) {
            Ok(store) => {
                schema_version = Some(store.schema_version()?);
                clients = Some(store.list_clients(true, 10_000)?.len());
                users = Some(store.list_users(None, true, 10_000)?.len());
            }
            Err(e) => store_error = Some(e.to_string()),
        }
    }
    let notifier = match &config.notifier {
        timebank_server::NotifierKind::Spool(dir) => format!("spool:{}", dir.display()),
        timebank_server::NotifierKind::HttpRelay(url) => format!("http:{url}"),
    };

    if machine {
        println!(
            "{}",
            json!({
                "data_dir": data_dir.display().to_string(),
                "db": db_path.display().to_string(),
                "db_exists": db_exists,
                "schema_version": schema_version,
                "clients": clients,
                "users": users,
                "store_error": store_error,
                "bind_addr": config.bind_addr,
                "notifier": notifier,
                "config_schema": timebank_server::CONFIG_SCHEMA_VERSION,
            })
        );
        return Ok(());
    }
    println!("data_dir={}", data_dir.display());
    println!("db={} exists={}", db_path.display(), db_exists);
    if let Some(version) = schema_version {
        println!("schema_version={version}");
    }
    if let (Some(clients), Some(users)) = (clients, users) {
        println!("clients={clients} users={users}");
    }
    if let Some(err) = store_error {
        println!("store_error={err}");
    }
    println!("bind_addr={}", config.bind_addr);
    println!("notifier={notifier}");
    println!("config_schema={}", timebank_server::CONFIG_SCHEMA_VERSION);
    if !db_exists {
        println!("hint: run `timebank init` to create the database");
    }
    Ok(())
}
