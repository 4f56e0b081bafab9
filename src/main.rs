use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};

use pvt::cli::{
    OutputFormat, build_cache, cache, match_archives, match_files, match_repos, store_package,
    suggest_archives, suggest_repos, validate_package, validate_system_packages,
};
use pvt::InstallationDecision;

/// pvt, the package provenance validation tool
#[derive(Parser)]
#[clap(version, author, about)]
pub struct Cli {
    #[command(flatten)]
    verbose: clap_verbosity_flag::Verbosity,

    /// Output a single JSON payload on stdout; suppresses human-readable logging.
    #[clap(long, global = true)]
    json: bool,

    /// Directory holding the operation cache. Defaults to the OS cache dir (or `PVT_CACHE_DIR`).
    #[clap(long, global = true)]
    op_cache_directory: Option<PathBuf>,

    /// Never read from the cache, only write to it.
    #[clap(long, global = true)]
    override_cache: bool,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum BuildDepsArg {
    Yes,
    Try,
    No,
}

impl From<BuildDepsArg> for InstallationDecision {
    fn from(value: BuildDepsArg) -> Self {
        match value {
            BuildDepsArg::Yes => InstallationDecision::Always,
            BuildDepsArg::Try => InstallationDecision::Try,
            BuildDepsArg::No => InstallationDecision::No,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Compares two file trees; succeeds iff every file under `--left` matches its counterpart
    /// under `--right`.
    MatchFiles {
        #[clap(long)]
        left: PathBuf,
        #[clap(long)]
        right: PathBuf,
    },
    /// Finds candidate upstream archives for a locally installed package's bundled sources.
    SuggestPackageArchives {
        #[clap(long)]
        package_name: String,
        #[clap(long)]
        srpm_file: Option<PathBuf>,
        /// Unused placeholder kept for the transformation-config pass (Phase A always runs).
        #[clap(long)]
        transform_archives: bool,
        #[clap(long)]
        output_json_path: Option<PathBuf>,
    },
    /// Finds candidate upstream repositories for a locally installed package's bundled sources.
    SuggestPackageRepos {
        #[clap(long)]
        package_name: String,
        #[clap(long)]
        srpm_file: Option<PathBuf>,
        #[clap(long)]
        output_json_path: Option<PathBuf>,
    },
    /// Matches local archives against suggested (or provided) upstream archives.
    MatchPackageArchives {
        #[clap(long)]
        package_name: String,
        #[clap(long)]
        input_archives_json_path: Option<PathBuf>,
        #[clap(long)]
        output_json_path: Option<PathBuf>,
    },
    /// Matches local archives against suggested (or provided) upstream repositories.
    MatchPackageRepos {
        #[clap(long)]
        package_name: String,
        #[clap(long)]
        input_repos_json_path: Option<PathBuf>,
        #[clap(long)]
        autotools_dir: Option<PathBuf>,
        #[clap(long, overrides_with = "no_apply_autotools")]
        apply_autotools: bool,
        #[clap(long, overrides_with = "apply_autotools")]
        no_apply_autotools: bool,
        #[clap(long)]
        output_json_path: Option<PathBuf>,
    },
    /// Runs the full suggest+match pipeline for one package and reports a valid/invalid verdict.
    ValidatePackage {
        #[clap(long)]
        package: String,
        #[clap(long, value_enum, default_value = "try")]
        install_build_deps: BuildDepsArg,
        #[clap(long)]
        srpm_file: Option<PathBuf>,
        #[clap(long)]
        autotools_dir: Option<PathBuf>,
        #[clap(long, overrides_with = "no_apply_autotools")]
        apply_autotools: bool,
        #[clap(long, overrides_with = "apply_autotools")]
        no_apply_autotools: bool,
        #[clap(long)]
        output_json_path: Option<PathBuf>,
    },
    /// Validates a sample of the whole installed package fleet.
    ValidateSystemPackages {
        #[clap(long)]
        nr_packages_to_check: Option<usize>,
        #[clap(long)]
        nr_processes: Option<usize>,
        #[clap(long, value_parser, num_args = 1..)]
        extra_package: Vec<String>,
        #[clap(long)]
        autotools_dir: Option<PathBuf>,
        #[clap(long, overrides_with = "no_apply_autotools")]
        apply_autotools: bool,
        #[clap(long, overrides_with = "apply_autotools")]
        no_apply_autotools: bool,
        #[clap(long)]
        output_json_path: Option<PathBuf>,
    },
    /// Fetches a package's source package and copies SPEC/SOURCE/SRPM_CONTENT to a directory.
    StorePackage {
        #[clap(long)]
        package_name: String,
        #[clap(long)]
        output_dir: PathBuf,
    },
    /// Reports or clears the operation cache.
    Cache {
        #[clap(long)]
        clean: bool,
    },
}

fn try_main() -> Result<()> {
    let cli = Cli::parse();
    let output_format = if cli.json { OutputFormat::Json } else { OutputFormat::Plain };

    env_logger::Builder::new()
        .filter_level(if output_format.is_json() {
            log::LevelFilter::Off
        } else {
            cli.verbose.log_level_filter()
        })
        .filter(Some("ureq"), log::LevelFilter::Off)
        .filter(Some("rustls"), log::LevelFilter::Off)
        .init();

    let op_cache = build_cache(cli.op_cache_directory, cli.override_cache)?;

    let valid = match cli.command {
        Command::MatchFiles { left, right } => match_files(&left, &right, output_format.is_json())?,
        Command::SuggestPackageArchives {
            package_name,
            srpm_file,
            transform_archives: _,
            output_json_path,
        } => suggest_archives(&package_name, srpm_file, output_json_path)?,
        Command::SuggestPackageRepos {
            package_name,
            srpm_file,
            output_json_path,
        } => suggest_repos(&package_name, srpm_file, output_json_path)?,
        Command::MatchPackageArchives {
            package_name,
            input_archives_json_path,
            output_json_path,
        } => match_archives(&package_name, input_archives_json_path, output_json_path)?,
        Command::MatchPackageRepos {
            package_name,
            input_repos_json_path,
            autotools_dir: _,
            apply_autotools,
            no_apply_autotools: _,
            output_json_path,
        } => match_repos(&package_name, input_repos_json_path, apply_autotools, output_json_path)?,
        Command::ValidatePackage {
            package,
            install_build_deps,
            srpm_file,
            autotools_dir: _,
            apply_autotools: _,
            no_apply_autotools: _,
            output_json_path,
        } => validate_package(&package, install_build_deps.into(), srpm_file, output_json_path, &op_cache)?,
        Command::ValidateSystemPackages {
            nr_packages_to_check,
            nr_processes,
            extra_package,
            autotools_dir: _,
            apply_autotools: _,
            no_apply_autotools: _,
            output_json_path,
        } => validate_system_packages(nr_packages_to_check, nr_processes, extra_package, output_json_path, &op_cache)?,
        Command::StorePackage { package_name, output_dir } => {
            store_package(&package_name, &output_dir)?;
            true
        }
        Command::Cache { clean } => {
            cache(&op_cache, clean)?;
            true
        }
    };

    if !valid {
        ::std::process::exit(1);
    }
    Ok(())
}

fn main() {
    if let Err(e) = try_main() {
        eprintln!("{e:?}");
        ::std::process::exit(1)
    }
}
