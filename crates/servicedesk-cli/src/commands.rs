//! Command-line verbs and their argument parsing.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde_json::Value;
use servicedesk_core::api::{ApiResponse, UploadFile};
use servicedesk_core::{Query, ResourceClient, Session};

pub const USAGE: &str = "\
Usage: servicedesk <command> [args]

Session:
  login [token]                  Store an auth token (prompts when omitted)
  logout                         Clear the stored session
  status                         Show API URL and session state

Requests:
  get <path> [key=value ...]     GET, printing status and body
  post <path> <json>             POST a JSON body
  put <path> [json] [key=value ...]
                                 PUT with optional body and query
  patch <path> [json]            PATCH, sending the JSON as `params`
  delete <path>                  DELETE
  download <path> <out-file>     GET a binary payload into a file
  upload <path> <field> <file>   POST a file as multipart/form-data

Configuration:
  SERVICEDESK_API_URL            Base URL of the admin API
  SERVICEDESK_TIMEOUT_SECS       Request timeout (unset: never time out)
  RUST_LOG                       Log filter (default: warn)";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Login { token: Option<String> },
    Logout,
    Status,
    Get { path: String, query: Query },
    Post { path: String, body: Value },
    Put { path: String, body: Option<Value>, query: Query },
    Patch { path: String, params: Option<Value> },
    Delete { path: String },
    Download { path: String, out: PathBuf },
    Upload { path: String, field: String, file: PathBuf },
    Help,
}

impl Command {
    pub fn parse(args: &[String]) -> Result<Self> {
        let Some((name, rest)) = args.split_first() else {
            return Ok(Command::Help);
        };

        let command = match name.as_str() {
            "login" => {
                expect_at_most(name, rest, 1)?;
                Command::Login {
                    token: rest.first().cloned(),
                }
            }
            "logout" => {
                expect_at_most(name, rest, 0)?;
                Command::Logout
            }
            "status" => {
                expect_at_most(name, rest, 0)?;
                Command::Status
            }
            "get" => {
                let (path, rest) = take_path(name, rest)?;
                Command::Get {
                    path,
                    query: parse_query(rest)?,
                }
            }
            "post" => {
                let (path, rest) = take_path(name, rest)?;
                expect_at_most(name, rest, 1)?;
                let raw = rest
                    .first()
                    .ok_or_else(|| anyhow::anyhow!("post requires a JSON body"))?;
                Command::Post {
                    path,
                    body: parse_json(raw)?,
                }
            }
            "put" => {
                let (path, rest) = take_path(name, rest)?;
                let (body, rest) = match rest.first() {
                    Some(raw) if looks_like_json(raw) => (Some(parse_json(raw)?), &rest[1..]),
                    _ => (None, rest),
                };
                Command::Put {
                    path,
                    body,
                    query: parse_query(rest)?,
                }
            }
            "patch" => {
                let (path, rest) = take_path(name, rest)?;
                expect_at_most(name, rest, 1)?;
                Command::Patch {
                    path,
                    params: rest.first().map(|raw| parse_json(raw)).transpose()?,
                }
            }
            "delete" => {
                let (path, rest) = take_path(name, rest)?;
                expect_at_most(name, rest, 0)?;
                Command::Delete { path }
            }
            "download" => {
                let (path, rest) = take_path(name, rest)?;
                match rest {
                    [out] => Command::Download {
                        path,
                        out: PathBuf::from(out),
                    },
                    _ => bail!("download requires <path> <out-file>"),
                }
            }
            "upload" => {
                let (path, rest) = take_path(name, rest)?;
                match rest {
                    [field, file] => Command::Upload {
                        path,
                        field: field.clone(),
                        file: PathBuf::from(file),
                    },
                    _ => bail!("upload requires <path> <field> <file>"),
                }
            }
            "help" | "-h" | "--help" => Command::Help,
            other => bail!("Unknown command: {}", other),
        };
        Ok(command)
    }

    /// Whether the command talks to the API, as opposed to local session state
    pub fn needs_api(&self) -> bool {
        !matches!(
            self,
            Command::Login { .. } | Command::Logout | Command::Status | Command::Help
        )
    }
}

fn take_path<'a>(command: &str, rest: &'a [String]) -> Result<(String, &'a [String])> {
    match rest.split_first() {
        Some((path, rest)) => Ok((path.clone(), rest)),
        None => bail!("{} requires a path", command),
    }
}

fn expect_at_most(command: &str, rest: &[String], max: usize) -> Result<()> {
    if rest.len() > max {
        bail!("Too many arguments for {}", command);
    }
    Ok(())
}

fn looks_like_json(raw: &str) -> bool {
    let raw = raw.trim_start();
    raw.starts_with('{') || raw.starts_with('[')
}

fn parse_json(raw: &str) -> Result<Value> {
    serde_json::from_str(raw).with_context(|| format!("Invalid JSON argument: {}", raw))
}

/// Parse `key=value` arguments into query parameters
pub fn parse_query(args: &[String]) -> Result<Query> {
    let mut query = Query::new();
    for arg in args {
        let Some((key, value)) = arg.split_once('=') else {
            bail!("Expected key=value, got: {}", arg);
        };
        if key.is_empty() {
            bail!("Empty query key in: {}", arg);
        }
        query.insert(key, value);
    }
    Ok(query)
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print an envelope: status line to stderr, body to stdout
fn print_response(response: &ApiResponse) -> Result<()> {
    eprintln!("HTTP {}", response.status);
    match response.json::<Value>() {
        Ok(value) => print_json(&value),
        Err(_) => {
            println!("{}", response.text());
            Ok(())
        }
    }
}

fn non_empty(query: &Query) -> Option<&Query> {
    (!query.is_empty()).then_some(query)
}

pub fn run_local(command: &Command, session: &Session, api_url: Option<&str>) -> Result<()> {
    match command {
        Command::Login { token } => {
            let token = match token {
                Some(token) => token.clone(),
                None => rpassword::prompt_password("Auth token: ")
                    .context("Failed to read token")?,
            };
            let token = token.trim();
            if token.is_empty() {
                bail!("Token must not be empty");
            }
            session.login(token)?;
            eprintln!("Token stored.");
        }
        Command::Logout => {
            session.logout()?;
            eprintln!("Logged out.");
        }
        Command::Status => {
            eprintln!("API URL:  {}", api_url.unwrap_or("(not configured)"));
            let state = if session.is_authenticated() {
                "logged in"
            } else {
                "logged out"
            };
            eprintln!("Session:  {}", state);
        }
        Command::Help => eprintln!("{}", USAGE),
        _ => bail!("Command requires the API client"),
    }
    Ok(())
}

pub async fn run_remote(command: Command, client: &ResourceClient) -> Result<()> {
    match command {
        Command::Get { path, query } => {
            let response = client.get(&path, non_empty(&query)).await?;
            print_response(&response)?;
        }
        Command::Post { path, body } => {
            let response = client.post(&path, &body).await?;
            print_response(&response)?;
        }
        Command::Put { path, body, query } => {
            let value: Value = client
                .update(&path, body.as_ref(), non_empty(&query))
                .await?;
            print_json(&value)?;
        }
        Command::Patch { path, params } => {
            let value: Value = client.patch(&path, params.as_ref()).await?;
            print_json(&value)?;
        }
        Command::Delete { path } => {
            let value: Value = client.delete(&path).await?;
            print_json(&value)?;
        }
        Command::Download { path, out } => {
            let response = client.file_get(&path).await?;
            write_download(&out, response.bytes())?;
            eprintln!("Saved {} bytes to {}", response.bytes().len(), out.display());
        }
        Command::Upload { path, field, file } => {
            let form = UploadFile::from_path(field, &file)?.into_form()?;
            let value: Value = client.upload(&path, form).await?;
            print_json(&value)?;
        }
        _ => bail!("Command does not use the API client"),
    }
    Ok(())
}

fn write_download(out: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(out, bytes).with_context(|| format!("Failed to write {}", out.display()))
}
