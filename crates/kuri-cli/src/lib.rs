//! kuri-cli — bibliothèque interne du binaire `kuri`
//!
//! Le parsing d'arguments reste dans `main.rs` ; ici : exécution des
//! commandes, E/S (écriture atomique, création des dossiers, chrono) et
//! rendu des diagnostics.
//!
//! - `compile` : `.kuri` → `.c` (plus `r16.h` à côté du fichier produit)
//! - `lexemes` : liste des lexèmes d'un fichier
//! - `arbre` : arbre syntaxique d'un fichier
//!
//! Traces (`feature = "trace"`) et couleurs (`feature = "color"`) optionnelles.

#![deny(unused_must_use)]
#![forbid(unsafe_code)]

use std::{
    fmt::Write as _,
    fs,
    fs::File,
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
    time::Instant,
};

use anyhow::{anyhow, Context, Result};

#[cfg(feature = "color")]
use owo_colors::OwoColorize;

use kuri_ast::Assembleuse;
use kuri_compiler::erreur::depuis_lexage;
use kuri_compiler::{Compilatrice, ErreurCompilation, EspaceModules, OptionsCompilation, R16_H};
use kuri_lexer::TableLignes;

// ───────────────────────────── Types publics ─────────────────────────────

/// Commande haut-niveau (sans parsing CLI — réservé à main.rs).
#[derive(Clone, Debug)]
pub enum Command {
    /// Compile un fichier Kuri vers C.
    Compile(CompileTask),
    /// Affiche les lexèmes d'un fichier.
    Lexemes(InspectTask),
    /// Affiche l'arbre syntaxique d'un fichier.
    Arbre(InspectTask),
}

/// Paramètres de `kuri compile`.
#[derive(Clone, Debug, Default)]
pub struct CompileTask {
    /// Fichier d'entrée.
    pub input: PathBuf,
    /// Destination du C.
    pub output: Output,
    /// Racine Kuri (dossier contenant `modules/`).
    pub racine: Option<PathBuf>,
    /// Fonction appelée par `main`.
    pub point_entree: Option<String>,
    /// Désactive les traces d'appel.
    pub sans_trace: bool,
    /// Crée les dossiers parents si besoin.
    pub auto_mkdir: bool,
    /// Affiche le temps de compilation.
    pub time: bool,
}

/// Paramètres de `kuri lexemes` et `kuri arbre`.
#[derive(Clone, Debug, Default)]
pub struct InspectTask {
    /// Fichier à inspecter.
    pub input: PathBuf,
}

/// Sortie du C.
#[derive(Clone, Debug, Default)]
pub enum Output {
    /// Fichier donné.
    Path(PathBuf),
    /// Sortie standard.
    Stdout,
    /// Même nom que l'entrée, extension `.c`.
    #[default]
    Auto,
}

// ───────────────────────────── Initialisation ─────────────────────────────

/// Initialise le logger selon la feature `trace`.
pub fn init_logger() {
    #[cfg(feature = "trace")]
    {
        let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
            .format_timestamp_secs()
            .try_init();
    }
}

// ───────────────────────────── Exécution ─────────────────────────────

/// Exécute une commande. Retourne un code de sortie.
pub fn execute(cmd: Command) -> Result<i32> {
    match cmd {
        Command::Compile(t) => compile_entry(t),
        Command::Lexemes(t) => inspect_entry(&t.input, rend_lexemes),
        Command::Arbre(t) => inspect_entry(&t.input, rend_arbre),
    }
}

fn compile_entry(task: CompileTask) -> Result<i32> {
    let CompileTask { input, output, racine, point_entree, sans_trace, auto_mkdir, time } = task;
    let mut options = OptionsCompilation { racine_kuri: racine, trace_appels: !sans_trace, ..OptionsCompilation::default() };
    if let Some(p) = point_entree {
        options.point_entree = p;
    }
    log::debug!("{options:?}");

    let start = Instant::now();
    let mut compilatrice = Compilatrice::new(options);
    let code = match compilatrice.compile_fichier(&input) {
        Ok(code) => code,
        Err(e) => {
            status_err(&e);
            return Ok(1);
        }
    };
    let elapsed = start.elapsed();

    let out_path = match &output {
        Output::Auto => default_c_path(&input),
        Output::Path(p) => p.clone(),
        Output::Stdout => PathBuf::new(),
    };

    if let Output::Stdout = output {
        let mut w = BufWriter::new(io::stdout().lock());
        w.write_all(code.as_bytes())?;
        w.flush()?;
    } else {
        if auto_mkdir {
            if let Some(parent) = out_path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
        }
        write_text_atomic(&out_path, &code).with_context(|| format!("écriture de {}", display(&out_path)))?;
        let r16 = out_path.with_file_name("r16.h");
        write_text_atomic(&r16, R16_H).with_context(|| format!("écriture de {}", display(&r16)))?;
        status_ok("COMPILE", &display(&out_path));
    }

    if time {
        status_info("TIME", &format!("compile: {} ms", elapsed.as_millis()));
    }
    Ok(0)
}

fn inspect_entry(input: &Path, rendu: fn(&str, &str) -> Result<String, ErreurCompilation>) -> Result<i32> {
    let src = fs::read_to_string(input).with_context(|| format!("lecture: {}", display(input)))?;
    match rendu(&display(input), &src) {
        Ok(texte) => {
            let mut w = BufWriter::new(io::stdout().lock());
            w.write_all(texte.as_bytes())?;
            w.flush()?;
            Ok(0)
        }
        Err(e) => {
            status_err(&e);
            Ok(1)
        }
    }
}

// ───────────────────────────── Rendus ─────────────────────────────

/// Espace à un seul fichier, pour localiser les erreurs.
fn espace_pour(nom: &str, src: &str) -> (EspaceModules, kuri_core::SourceId) {
    let mut espace = EspaceModules::new(None);
    let module = espace.cree_module("principal", None);
    let id = espace.ajoute_fichier(nom, None, src.to_owned(), module);
    (espace, id)
}

/// Une ligne par lexème : `ligne:colonne genre 'texte'`.
pub fn rend_lexemes(nom: &str, src: &str) -> Result<String, ErreurCompilation> {
    let (espace, id) = espace_pour(nom, src);
    let lexemes = kuri_lexer::lexe(src, id).map_err(|e| espace.localise(depuis_lexage(&e)))?;
    let lignes = TableLignes::new(src);
    let mut out = String::new();
    for l in &lexemes {
        let (ligne, colonne) = lignes.ligne_colonne(l.span.start);
        let _ = writeln!(out, "{ligne:>4}:{colonne:<4} {:<20} '{}'", format!("{:?}", l.genre), l.chaine);
    }
    Ok(out)
}

/// Arbre syntaxique indenté.
pub fn rend_arbre(nom: &str, src: &str) -> Result<String, ErreurCompilation> {
    let (espace, id) = espace_pour(nom, src);
    let lexemes = kuri_lexer::lexe(src, id).map_err(|e| espace.localise(depuis_lexage(&e)))?;
    let mut asm = Assembleuse::new();
    let (racine, _) = kuri_parser::analyse_fichier(&lexemes, id, &mut asm).map_err(|e| espace.localise(e))?;
    Ok(asm.imprime_arbre(racine))
}

// ───────────────────────────── Utilitaires E/S ─────────────────────────────

fn write_text_atomic(path: &Path, text: &str) -> Result<()> {
    let parent = path.parent().map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    let parent = if parent.as_os_str().is_empty() { PathBuf::from(".") } else { parent };
    let base = path.file_name().ok_or_else(|| anyhow!("chemin de sortie sans nom: {}", display(path)))?;
    let tmp = unique_tmp_path(&parent, base);
    {
        let mut w = BufWriter::new(File::create(&tmp)?);
        w.write_all(text.as_bytes())?;
        w.flush()?;
    }
    if path.exists() {
        // Windows : Rename sur cible existante peut échouer
        let _ = fs::remove_file(path);
    }
    fs::rename(&tmp, path).or_else(|_| fs::copy(&tmp, path).map(|_| ()).and_then(|()| fs::remove_file(&tmp)))?;
    Ok(())
}

fn unique_tmp_path(dir: &Path, base: &std::ffi::OsStr) -> PathBuf {
    let mut i = 0u32;
    loop {
        let candidate = dir.join(format!("{}.tmp{}", base.to_string_lossy(), i));
        if !candidate.exists() {
            return candidate;
        }
        i = i.wrapping_add(1);
    }
}

/// `dossier/nom.kuri` → `dossier/nom.c`
pub fn default_c_path(src: &Path) -> PathBuf {
    let mut p = src.to_path_buf();
    p.set_extension("c");
    p
}

fn display(p: &Path) -> String { p.to_string_lossy().to_string() }

// ───────────────────────────── Sorties jolies ─────────────────────────────

fn status_ok(tag: &str, msg: &str) {
    #[cfg(feature = "color")]
    {
        eprintln!("{} {}", tag.green().bold(), msg);
    }
    #[cfg(not(feature = "color"))]
    {
        eprintln!("{tag} {msg}");
    }
}

fn status_info(tag: &str, msg: &str) {
    #[cfg(feature = "color")]
    {
        eprintln!("{} {}", tag.blue().bold(), msg);
    }
    #[cfg(not(feature = "color"))]
    {
        eprintln!("{tag} {msg}");
    }
}

fn status_err(e: &ErreurCompilation) {
    let rapport = e.rapport();
    #[cfg(feature = "color")]
    {
        let mut lignes = rapport.lines();
        if let Some(entete) = lignes.next() {
            eprintln!("{}", entete.red().bold());
        }
        for l in lignes {
            eprintln!("{}", l.dimmed());
        }
    }
    #[cfg(not(feature = "color"))]
    {
        eprintln!("{rapport}");
    }
}

// ───────────────────────────── Tests ─────────────────────────────
