// Line-oriented console for building places one at a time.
//
// A session starts with no places. `region` picks the ICS, `add` claims a
// hand-picked group, `import` claims every group in a CSV, `reset` starts over.
use crate::catalog::PracticeCatalog;
use crate::export;
use crate::session::{AllocationSession, PlaceSelection};
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{self, BufRead, Write};

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Regions,
    Region(String),
    Available,
    Add(PlaceSelection),
    /// Claim every practice still available in the ICS
    AddAll(String),
    Import(String),
    Summary,
    Groups,
    Save,
    Reset,
    Help,
    Quit,
}

/// Parse one console line. `None` for blank or unrecognised input.
///
/// `add <place> = <practice>; <practice>; ...` or `add <place> = *`
pub fn parse_action(line: &str) -> Option<Action> {
    let line = line.trim();
    let (command, rest) = line
        .split_once(char::is_whitespace)
        .map_or((line, ""), |(c, r)| (c, r.trim()));

    let action = match command.to_lowercase().as_str() {
        "regions" => Action::Regions,
        "region" if !rest.is_empty() => Action::Region(rest.to_string()),
        "available" | "list" => Action::Available,
        "add" => {
            let (name, practices) = rest.split_once('=')?;
            if practices.trim() == "*" {
                return Some(Action::AddAll(name.trim().to_string()));
            }
            Action::Add(PlaceSelection::new(
                name.trim(),
                practices
                    .split(';')
                    .map(str::trim)
                    .filter(|p| !p.is_empty()),
            ))
        }
        "import" if !rest.is_empty() => Action::Import(rest.to_string()),
        "summary" | "table" => Action::Summary,
        "groups" => Action::Groups,
        "save" => Action::Save,
        "reset" => Action::Reset,
        "help" | "?" => Action::Help,
        "quit" | "exit" => Action::Quit,
        _ => return None,
    };
    Some(action)
}

pub fn run(catalog: &PracticeCatalog, region: Option<String>, output_dir: &str) -> Result<()> {
    let mut session = AllocationSession::new(catalog);
    let mut region = region
        .map(|r| r.trim().to_string())
        .filter(|r| catalog.region(r).next().is_some());
    print_help();

    let stdin = io::stdin();
    loop {
        print!("{}> ", region.as_deref().unwrap_or("no ICS"));
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let Some(action) = parse_action(&line) else {
            if !line.trim().is_empty() {
                println!("❓ Unknown command. Type `help` for the list.");
            }
            continue;
        };

        match action {
            Action::Quit => break,
            Action::Help => print_help(),
            Action::Regions => {
                for name in catalog.regions() {
                    println!("   {}", name);
                }
            }
            Action::Region(name) => {
                if catalog.region(&name).next().is_none() {
                    println!("❌ ICS `{}` is not in the practice data", name);
                } else {
                    println!("🏥 Selected ICS: {}", name);
                    region = Some(name);
                }
            }
            Action::Reset => {
                session.reset();
                println!("🧹 All places removed; every practice is available again");
            }
            Action::Summary => {
                if session.rows().is_empty() {
                    println!("   No places defined yet");
                } else {
                    export::print_summary(&session);
                }
            }
            Action::Groups => {
                for row in session.accumulator().export_places_table() {
                    println!("   {}", row.join(" | "));
                }
                println!(
                    "   {} places, {} practices assigned",
                    session.tracker().history().len(),
                    session.tracker().claimed_count()
                );
            }
            action @ (Action::Available
            | Action::Add(_)
            | Action::AddAll(_)
            | Action::Import(_)
            | Action::Save) => {
                let Some(region) = region.as_deref() else {
                    println!("❌ Select an ICS first: region <name>");
                    continue;
                };
                if let Err(e) = apply(&mut session, region, action, output_dir) {
                    println!("❌ {:#}", e);
                }
            }
        }
    }

    Ok(())
}

fn apply(
    session: &mut AllocationSession,
    region: &str,
    action: Action,
    output_dir: &str,
) -> Result<()> {
    match action {
        Action::Available => {
            for practice in session.available(region) {
                println!("   {}", practice.id);
            }
        }
        Action::Add(selection) => add(session, region, selection),
        Action::AddAll(name) => {
            let selection = session.select_all(region, &name);
            add(session, region, selection);
        }
        Action::Import(path) => {
            let file = File::open(&path).with_context(|| format!("Failed to open groups file: {}", path))?;
            for selection in export::read_groups(file)? {
                add(session, region, selection);
            }
        }
        Action::Save => {
            let (results, groups) = export::save_session(session, region, output_dir)?;
            println!("💾 Saved {} and {}", results.display(), groups.display());
        }
        _ => {}
    }
    Ok(())
}

fn add(session: &mut AllocationSession, region: &str, selection: PlaceSelection) {
    let name = selection.name.clone();
    match session.add_place(region, selection) {
        Ok(()) => println!("   ✅ Added {}", name),
        Err(e) => println!("   ❌ {}: {}", name, e),
    }
}

fn print_help() {
    println!("Commands:");
    println!("   regions                          list ICSs");
    println!("   region <name>                    select an ICS");
    println!("   available                        list unassigned practices in the ICS");
    println!("   add <place> = <practice>; ...    define a place from practices");
    println!("   add <place> = *                  define a place from every available practice");
    println!("   import <file>                    define places from a place,practice CSV");
    println!("   summary                          show need indices");
    println!("   groups                           show practices per place");
    println!("   save                             write both tables to the output directory");
    println!("   reset                            remove every place");
    println!("   quit");
}
