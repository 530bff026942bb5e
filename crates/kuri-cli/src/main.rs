//! `kuri` — CLI du compilateur Kuri
//!
//! Ici on fait uniquement : parsing d'arguments, initialisation (logger,
//! couleur), et délégation à `kuri_cli` (lib).

#![forbid(unsafe_code)]

use std::{path::PathBuf, process::ExitCode};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};

use kuri_cli as cli;

// ──────────────────────────── CLI (clap) ────────────────────────────

#[derive(Debug, Parser)]
#[command(name = "kuri", version, about = "Kuri — compile des fichiers .kuri vers C", long_about = None)]
struct Opt {
    /// Augmente la verbosité (-v, -vv, -vvv)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Mode silencieux (casse la verbosité)
    #[arg(short = 'q', long = "quiet", action = ArgAction::SetTrue, global = true)]
    quiet: bool,

    /// Force la couleur (si la feature `color` est compilée)
    #[arg(long = "color", value_enum, default_value_t = ColorChoice::Auto, global = true)]
    color: ColorChoice,

    /// Sous-commandes
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ColorChoice {
    Auto,
    Always,
    Never,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Compiler un fichier .kuri vers C
    Compile {
        /// Fichier source
        entree: PathBuf,
        /// Fichier C produit (même nom + .c si omis, - pour stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Dossier contenant `modules/` (sinon RACINE_KURI)
        #[arg(long)]
        racine: Option<PathBuf>,
        /// Ne pas enregistrer de traces d'appel
        #[arg(long = "sans-trace")]
        sans_trace: bool,
        /// Fonction appelée par `main`
        #[arg(long = "point-entree")]
        point_entree: Option<String>,
        /// Créer les dossiers parents si nécessaire
        #[arg(long = "mkdir")]
        auto_mkdir: bool,
        /// Afficher le temps de compilation
        #[arg(long)]
        time: bool,
    },

    /// Afficher les lexèmes d'un fichier
    Lexemes {
        /// Fichier source
        fichier: PathBuf,
    },

    /// Afficher l'arbre syntaxique d'un fichier
    Arbre {
        /// Fichier source
        fichier: PathBuf,
    },
}

// ──────────────────────────── Logger / Verbosité ────────────────────────────

fn init_telemetry(verbose: u8, quiet: bool) {
    #[cfg(feature = "trace")]
    {
        let level = if quiet {
            "error"
        } else {
            match verbose {
                0 => "warn",
                1 => "info",
                2 => "debug",
                _ => "trace",
            }
        };
        std::env::set_var("RUST_LOG", std::env::var("RUST_LOG").unwrap_or_else(|_| level.to_string()));
        cli::init_logger();
    }
    #[cfg(not(feature = "trace"))]
    {
        let _ = (verbose, quiet);
    }
}

fn init_color(choice: ColorChoice) {
    match choice {
        ColorChoice::Auto => {}
        ColorChoice::Always => {
            std::env::set_var("CLICOLOR_FORCE", "1");
            std::env::remove_var("NO_COLOR");
        }
        ColorChoice::Never => {
            std::env::set_var("NO_COLOR", "1");
            std::env::remove_var("CLICOLOR_FORCE");
        }
    }
}

// ──────────────────────────── main ────────────────────────────

fn main() -> ExitCode {
    match real_main() {
        Ok(0) => ExitCode::SUCCESS,
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        Err(e) => {
            eprintln!("erreur: {e:#}");
            ExitCode::from(1)
        }
    }
}

fn real_main() -> Result<i32> {
    let opt = Opt::parse();

    init_color(opt.color);
    init_telemetry(opt.verbose, opt.quiet);

    let command = match opt.cmd {
        Command::Compile { entree, output, racine, sans_trace, point_entree, auto_mkdir, time } => {
            let output = match output {
                Some(p) if p.as_os_str() == "-" => cli::Output::Stdout,
                Some(p) => cli::Output::Path(p),
                None => cli::Output::Auto,
            };
            cli::Command::Compile(cli::CompileTask { input: entree, output, racine, point_entree, sans_trace, auto_mkdir, time })
        }
        Command::Lexemes { fichier } => cli::Command::Lexemes(cli::InspectTask { input: fichier }),
        Command::Arbre { fichier } => cli::Command::Arbre(cli::InspectTask { input: fichier }),
    };

    cli::execute(command).context("échec d'exécution de la commande")
}
