//! Employees command - manage the roster and bucket rows by shift.

use anyhow::{Result, bail};
use bidscope_core::{Employee, Meridiem, bucket_by_shift};
use bidscope_store::{DatasetStore, EmployeeStore};
use clap::{Args, Subcommand};

use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, OutputFormat};

const DEFAULT_COLOR: &str = "#3b82f6";

/// Arguments for the employees command.
#[derive(Args)]
pub struct EmployeesArgs {
    #[command(subcommand)]
    pub action: EmployeesAction,
}

/// Employees subcommands.
#[derive(Subcommand)]
pub enum EmployeesAction {
    /// List employees.
    List,

    /// Add an employee.
    Add {
        /// Display name.
        name: String,
        /// Shift start, e.g. `9AM`.
        #[arg(long, value_parser = parse_clock)]
        start: (u8, Meridiem),
        /// Shift end, e.g. `5PM`.
        #[arg(long, value_parser = parse_clock)]
        end: (u8, Meridiem),
        /// Display color.
        #[arg(long, default_value = DEFAULT_COLOR)]
        color: String,
    },

    /// Change an employee.
    Update {
        /// Employee id.
        id: u64,
        /// New name.
        #[arg(long)]
        name: Option<String>,
        /// New shift start.
        #[arg(long, value_parser = parse_clock)]
        start: Option<(u8, Meridiem)>,
        /// New shift end.
        #[arg(long, value_parser = parse_clock)]
        end: Option<(u8, Meridiem)>,
        /// New color.
        #[arg(long)]
        color: Option<String>,
    },

    /// Remove an employee.
    Remove {
        /// Employee id.
        id: u64,
    },

    /// Break a saved dataset down by shift.
    Shifts {
        /// Dataset name.
        dataset: String,
    },
}

/// Runs the employees command.
pub async fn run(args: &EmployeesArgs, cli: &Cli) -> Result<()> {
    let store = EmployeeStore::load_default().await;
    let text = TextFormatter::new(!cli.no_color);
    let json = JsonFormatter::new(cli.pretty);

    match &args.action {
        EmployeesAction::List => {
            let employees = store.list().await;
            match cli.format {
                OutputFormat::Text => println!("{}", text.format_employees(&employees)),
                OutputFormat::Json => println!("{}", json.format(&employees)?),
            }
        }
        EmployeesAction::Add {
            name,
            start,
            end,
            color,
        } => {
            let employee = store
                .add(Employee {
                    id: 0,
                    name: name.trim().to_string(),
                    color: color.clone(),
                    start_hour: start.0,
                    start_am_pm: start.1,
                    end_hour: end.0,
                    end_am_pm: end.1,
                })
                .await?;
            print_employee(cli, &text, &json, "Added", &employee)?;
        }
        EmployeesAction::Update {
            id,
            name,
            start,
            end,
            color,
        } => {
            let Some(mut employee) = store.get(*id).await else {
                bail!("Employee not found: {id}");
            };
            if let Some(name) = name {
                employee.name = name.trim().to_string();
            }
            if let Some((hour, meridiem)) = start {
                employee.start_hour = *hour;
                employee.start_am_pm = *meridiem;
            }
            if let Some((hour, meridiem)) = end {
                employee.end_hour = *hour;
                employee.end_am_pm = *meridiem;
            }
            if let Some(color) = color {
                employee.color.clone_from(color);
            }
            store.update(employee.clone()).await?;
            print_employee(cli, &text, &json, "Updated", &employee)?;
        }
        EmployeesAction::Remove { id } => {
            let employee = store.remove(*id).await?;
            print_employee(cli, &text, &json, "Removed", &employee)?;
        }
        EmployeesAction::Shifts { dataset } => {
            let dataset = DatasetStore::open_default().load(dataset).await?;
            let employees = store.list().await;
            let buckets = bucket_by_shift(&dataset.rows, &employees);
            match cli.format {
                OutputFormat::Text => {
                    println!("{}", text.format_dataset_meta(&dataset.meta));
                    println!("{}", "─".repeat(40));
                    println!("{}", text.format_shifts(&buckets));
                }
                OutputFormat::Json => println!("{}", json.format_shifts(&buckets)?),
            }
        }
    }

    Ok(())
}

fn print_employee(
    cli: &Cli,
    text: &TextFormatter,
    json: &JsonFormatter,
    verb: &str,
    employee: &Employee,
) -> Result<()> {
    match cli.format {
        OutputFormat::Text => println!(
            "{}",
            text.format_success(&format!(
                "{verb} {} (#{}, {})",
                employee.name,
                employee.id,
                employee.window_label()
            ))
        ),
        OutputFormat::Json => println!("{}", json.format(employee)?),
    }
    Ok(())
}

/// Parses a 12-hour clock time such as `9PM`, `9 pm` or `10:00AM`.
pub fn parse_clock(value: &str) -> Result<(u8, Meridiem), String> {
    let value = value.trim();
    if value.len() < 3 || !value.is_char_boundary(value.len() - 2) {
        return Err(format!("expected a time like 9AM or 5PM, got {value:?}"));
    }
    let (hour, meridiem) = value.split_at(value.len() - 2);
    let meridiem = meridiem.parse::<Meridiem>().map_err(|e| e.to_string())?;

    let hour = hour.trim();
    let hour = hour.strip_suffix(":00").unwrap_or(hour);
    let hour: u8 = hour
        .parse()
        .map_err(|_| format!("expected an hour between 1 and 12, got {hour:?}"))?;
    if !(1..=12).contains(&hour) {
        return Err(format!("expected an hour between 1 and 12, got {hour}"));
    }
    Ok((hour, meridiem))
}
