use std::path::PathBuf;

use clap::Parser;
use console::style;

mod cli;
mod compiler;
mod configure;
mod dep_scanner;
mod driver;
mod emit;
mod error;
mod graph;
mod manifest;
mod module_support;
mod object_closure;
mod path_mapper;
mod project;
mod scaffold;
mod test_probe;

use cli::{Cli, Command};
use compiler::Compiler;
use error::*;
use manifest::{BuildProfile, Manifest};
use project::ProjectContext;

const MANIFEST_FILE: &str = "Cabin.toml";

fn main() {
    let cli = Cli::parse();
    cli.color.apply();

    let log_level = match cli.verbose {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    pretty_env_logger::formatted_builder().filter_level(log_level).init();

    if let Err(err) = run(cli) {
        eprintln!("{} {err}", style("error:").red().bold());
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::New { project_name, template } => {
            let dest = PathBuf::from(&project_name);
            scaffold::scaffold(&dest, &template, &project_name)?;
            println!("{} {project_name}", style("Created").green().bold());
            Ok(())
        }
        Command::Build { profile } => build(profile, cli.jobs, driver::Verbosity::Normal).map(|_| ()),
        Command::Run { profile, exe_args } => {
            let (project, _) = build(profile, cli.jobs, driver::Verbosity::Normal)?;
            let binary = project.out_base_path.join(&project.package_name);
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .map_err(|e| Error::DriverError(e.to_string()))?;
            let status = rt
                .block_on(async { tokio::process::Command::new(&binary).args(&exe_args).status().await })
                .map_err(|e| Error::DriverError(format!("failed to run {}: {e}", binary.display())))?;
            std::process::exit(status.code().unwrap_or(1));
        }
        Command::Test { profile } => {
            let (project, g) = build(profile, cli.jobs, driver::Verbosity::Normal)?;
            if g.test_targets.is_empty() {
                println!("{}", style("no test translation units discovered").yellow());
                return Ok(());
            }
            driver::run(&project.out_base_path, cli.jobs.max(1), driver::Verbosity::Normal)?;
            println!("{} {} test binaries", style("Built").green().bold(), g.test_targets.len());
            Ok(())
        }
        Command::Clean { profile } => {
            let out_base = cli::out_base_path(&std::env::current_dir().map_err(|e| Error::io(".", e))?, profile);
            if out_base.exists() {
                std::fs::remove_dir_all(&out_base).map_err(|e| Error::io(out_base.clone(), e))?;
            }
            println!("{} {}", style("Removed").green().bold(), out_base.display());
            Ok(())
        }
    }
}

fn build(
    profile: BuildProfile,
    jobs: usize,
    verbosity: driver::Verbosity,
) -> Result<(ProjectContext, graph::Graph)> {
    let root_path = std::env::current_dir().map_err(|e| Error::io(".", e))?;
    let manifest = Manifest::load(&root_path.join(MANIFEST_FILE))?;
    let out_base_path = cli::out_base_path(&root_path, profile);

    let mut project = ProjectContext::new(root_path, manifest, out_base_path);
    if profile == BuildProfile::Release {
        project.compiler_opts.c_flags.others.push("-O3".to_string());
    } else {
        project.compiler_opts.c_flags.others.push("-g".to_string());
    }
    for cxxflag in project.manifest.profile.get(profile.as_str()).map(|p| p.cxxflags.clone()).unwrap_or_default() {
        project.compiler_opts.c_flags.others.push(cxxflag);
    }

    let compiler = Compiler::init()?;
    log::info!("using compiler: {}", compiler.cxx);

    let mut graph = graph::Graph::new();
    let pb = indicatif::ProgressBar::new_spinner();
    pb.set_message("scanning sources");
    pb.enable_steady_tick(std::time::Duration::from_millis(120));
    let outcome = configure::configure_build(&mut project, &mut graph, &compiler, jobs.max(1));
    pb.finish_and_clear();
    outcome?;

    if !configure::is_up_to_date(&project, "build.ninja") {
        let family = compiler.family();
        let vars = emit::Variables {
            cxx_flags: path_mapper::join_flags(&project.compiler_opts.c_flags.others),
            defines: path_mapper::join_flags(&project.compiler_opts.c_flags.macros),
            includes: path_mapper::join_flags(
                project
                    .compiler_opts
                    .c_flags
                    .include_dirs
                    .iter()
                    .map(|d| format!("{}{d}", family.include_flag())),
            ),
            ld_flags: path_mapper::combine_flags(&[
                &path_mapper::join_flags(&project.compiler_opts.ld_flags.others),
                &path_mapper::join_flags(
                    project.compiler_opts.ld_flags.lib_dirs.iter().map(|d| format!("-L{d}")),
                ),
            ]),
            libs: path_mapper::join_flags(project.compiler_opts.ld_flags.libs.iter().map(|l| format!("-l{l}"))),
        };
        emit::write_build_files(&project.out_base_path, &graph, &compiler, &vars)?;
        driver::generate_compdb(&project.out_base_path)?;
        log::debug!("regenerated build graph at {}", project.out_base_path.display());
    }

    if driver::needs_work(&project.out_base_path, &graph.default_targets)? {
        driver::run(&project.out_base_path, jobs.max(1), verbosity)?;
    } else {
        log::debug!("ninja: no work to do");
    }
    Ok((project, graph))
}
