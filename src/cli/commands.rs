use anyhow::Result;
use colored::Colorize;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::{
    app::{build_services, global_config_path, init_config, Config, Services},
    server::serve,
    session::{ProfileRegistry, SessionState, TurnReply},
};

use super::{Commands, OutputFormat};

/// Handle CLI subcommands
pub async fn handle_command(command: Commands, mut config: Config) -> Result<()> {
    match command {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            let services = build_services(&config)?;
            serve(&config, services).await
        }
        Commands::Chat {
            owner,
            entity,
            message,
            output_format,
        } => {
            let services = build_services(&config)?;
            match message {
                Some(message) => {
                    let reply = services.sessions.handle_turn(&owner, &entity, &message).await?;
                    print_reply(&entity, &reply, output_format)
                }
                None => interactive_chat(&services, &owner, &entity, output_format).await,
            }
        }
        Commands::Profiles => {
            list_profiles();
            Ok(())
        }
        Commands::Quiz {
            topic,
            output_format,
        } => {
            let services = build_services(&config)?;
            let quiz = services.quiz.generate(&topic).await;
            match output_format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&quiz)?),
                OutputFormat::Text => {
                    if quiz.questions.is_empty() {
                        println!("{}", "No quiz could be generated right now.".yellow());
                    }
                    for (i, question) in quiz.questions.iter().enumerate() {
                        println!("{}. {}", i + 1, question.question.bold());
                        for (j, option) in question.options.iter().enumerate() {
                            let line = format!("   {}) {}", (b'a' + j as u8) as char, option);
                            if j == question.answer_index {
                                println!("{}", line.green());
                            } else {
                                println!("{}", line);
                            }
                        }
                    }
                }
            }
            Ok(())
        }
        Commands::Init => {
            println!("Initializing Temple Voice configuration...");
            for path in init_config()? {
                println!("  Created {}", path.display());
            }
            println!("Configuration initialized successfully!");
            Ok(())
        }
        Commands::Status => show_status(&config),
    }
}

async fn interactive_chat(
    services: &Services,
    owner: &str,
    entity: &str,
    output_format: OutputFormat,
) -> Result<()> {
    // A fresh session opens with the entity's welcome
    if services.sessions.state(owner, entity).await? == SessionState::New {
        let reply = services.sessions.handle_turn(owner, entity, "").await?;
        print_reply(entity, &reply, output_format)?;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        eprint!("{} ", ">".cyan());
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "exit" || line == "quit" {
            break;
        }
        match services.sessions.handle_turn(owner, entity, line).await {
            Ok(reply) => print_reply(entity, &reply, output_format)?,
            Err(err) => eprintln!("{} {}", "error:".red(), err.public_message()),
        }
    }
    Ok(())
}

fn print_reply(entity: &str, reply: &TurnReply, output_format: OutputFormat) -> Result<()> {
    match output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string(reply)?),
        OutputFormat::Text => {
            let speaker = ProfileRegistry::builtin().resolve(entity).display_name;
            println!("{}: {}", speaker.bold(), reply.reply_text);
            println!("  {}", reply.audio_url.dimmed());
        }
    }
    Ok(())
}

/// List the built-in entity profiles
pub fn list_profiles() {
    println!("Available profiles:");
    for profile in ProfileRegistry::builtin().profiles() {
        println!(
            "  • {} {} {}",
            profile.display_name.green(),
            format!("[{:?}]", profile.kind).dimmed(),
            profile.voice_id
        );
    }
}

/// Show configuration and credential status
fn show_status(config: &Config) -> Result<()> {
    println!("Temple Voice Status:");
    println!();

    let config_path = global_config_path()?;
    if config_path.exists() {
        println!("  [OK] Configuration: {}", config_path.display());
    } else {
        println!("  [WARNING] Configuration: Not found (using defaults)");
    }

    println!(
        "  Completion: {:?} / {}",
        config.completion.provider, config.completion.model
    );
    println!("  Blob storage: {:?}", config.blob.backend);
    println!("  Documents: {:?}", config.documents.backend);
    println!("  Concurrency: {:?}", config.session.concurrency);

    println!("\n  Environment:");
    for var in [
        &config.completion.api_key_env,
        &config.speech.api_key_env,
        &config.blob.access_token_env,
        &config.documents.access_token_env,
    ] {
        if std::env::var(var).is_ok() {
            println!("    • {}: {}", var, "Set".green());
        } else {
            println!("    • {}: {}", var, "Not set".red());
        }
    }

    println!();
    Ok(())
}
