use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use loupe::areas::filesystem::FilesystemStore;
use loupe::areas::relational::RelationalStore;
use loupe::areas::repository::Repository;
use loupe::areas::store::ObjectStore;
use loupe::artifacts::objects::object_id::ObjectId;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "loupe",
    version = "0.1.0",
    about = "A loose-object database verifier, differ and cloner",
    long_about = "loupe reads git-style object databases without touching a working tree. \
    It validates every object reachable from HEAD, lists the changes a commit introduced, \
    checks out a snapshot, and clones whole histories across storage backends.",
    help_template = r"
{name} {version} - {about}

USAGE:
    {usage}

OPTIONS:
    {all-args}
",
)]
struct Cli {
    #[arg(
        long,
        global = true,
        default_value = ".",
        help = "Path to the repository (or database file for the sqlite backend)"
    )]
    path: PathBuf,
    #[arg(long, global = true, help = "The directory is itself the git directory")]
    bare: bool,
    #[arg(long, global = true, value_enum, default_value_t = Backend::Git)]
    backend: Backend,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Backend {
    /// Loose objects under a git directory
    Git,
    /// SQLite database file
    Sqlite,
}

#[derive(Subcommand)]
enum Commands {
    #[command(
        name = "fsck",
        about = "Validate every object reachable from HEAD",
        long_about = "This command walks the full ancestry of HEAD and verifies each commit, \
        tree and blob: stored hashes, declared sizes and referenced object types."
    )]
    Fsck,
    #[command(name = "count", about = "Count the commits reachable from HEAD")]
    Count,
    #[command(
        name = "max-parents",
        about = "Find the commit with the most parents"
    )]
    MaxParents,
    #[command(name = "branches", about = "List branch names")]
    Branches,
    #[command(
        name = "changes",
        about = "List the changes a commit introduced",
        long_about = "This command diffs a commit against all of its parents, applying merge \
        rules and rename detection. Defaults to HEAD when no commit is given."
    )]
    Changes {
        #[arg(index = 1, help = "The commit to inspect, HEAD when omitted")]
        commit: Option<String>,
    },
    #[command(
        name = "checkout",
        about = "Write the HEAD snapshot into a directory",
        long_about = "This command materializes the tree of the HEAD commit into the given \
        directory. Symlinks and submodules are skipped."
    )]
    Checkout {
        #[arg(index = 1, help = "Destination directory")]
        destination: PathBuf,
    },
    #[command(
        name = "clone",
        about = "Clone the full history into another repository",
        long_about = "This command copies every commit, tree and blob reachable from HEAD into \
        a target repository, possibly of a different storage backend, and points a branch at \
        the cloned head. Interrupted clones resume where they stopped when the target keeps a \
        clone index."
    )]
    Clone {
        #[arg(index = 1, help = "Destination git directory or database file")]
        destination: PathBuf,
        #[arg(long, default_value = "master", help = "Branch to create in the target")]
        branch: String,
        #[arg(long, value_enum, default_value_t = Backend::Git, help = "Target backend")]
        to: Backend,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.backend {
        Backend::Git => run(
            Repository::new(FilesystemStore::new(&cli.path, cli.bare)),
            &cli.command,
        ),
        Backend::Sqlite => run(
            Repository::new(RelationalStore::open(&cli.path)?),
            &cli.command,
        ),
    }
}

fn run<S: ObjectStore>(repository: Repository<S>, command: &Commands) -> Result<()> {
    match command {
        Commands::Fsck => {
            let count = repository.validate()?;
            println!("{count} commits validated");
        }
        Commands::Count => {
            println!("{}", repository.commit_count()?);
        }
        Commands::MaxParents => {
            let (id, count) = repository.max_parents()?;
            println!("{id} {count}");
        }
        Commands::Branches => {
            for name in repository.branch_names()? {
                println!("{name}");
            }
        }
        Commands::Changes { commit } => {
            let id = match commit {
                Some(raw) => ObjectId::try_parse(raw.clone())?,
                None => repository.head_id()?,
            };

            for change in repository.changes_introduced_by(&id)? {
                let detail = match (&change.old[..], &change.new) {
                    ([], Some(new)) => new.clone(),
                    (old, Some(new)) => format!("{} -> {new}", old.join(",")),
                    (old, None) => old.join(","),
                };
                println!("{}\t{}\t{detail}", change.action.status_letter(), change.path);
            }
        }
        Commands::Checkout { destination } => {
            repository.checkout_head_into(destination)?;
            println!("Checked out HEAD into {}", destination.display());
        }
        Commands::Clone {
            destination,
            branch,
            to,
        } => {
            let head_clone = match to {
                Backend::Git => {
                    let store = FilesystemStore::new(destination, true);
                    store.init()?;
                    repository.clone_into(&Repository::new(store), branch)?
                }
                Backend::Sqlite => {
                    let store = RelationalStore::open(destination)?;
                    repository.clone_into(&Repository::new(store), branch)?
                }
            };
            println!("Cloned HEAD as {head_clone}");
        }
    }

    Ok(())
}
