pub mod generate;

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser)]
#[command(
    name = "backoffice-seed",
    version,
    about = "Generate a SQL seed script from the back-office workbook."
)]
pub struct Cli {
    /// Path to the Excel workbook
    #[arg(long)]
    pub excel: PathBuf,
    /// Output SQL file (default: seed_data.sql, or `output` in settings.json)
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_excel_is_required() {
        assert!(Cli::try_parse_from(["backoffice-seed"]).is_err());
        let cli = Cli::try_parse_from(["backoffice-seed", "--excel", "book.xlsx"]).unwrap();
        assert_eq!(cli.excel, PathBuf::from("book.xlsx"));
        assert!(cli.out.is_none());
    }

    #[test]
    fn test_out_override() {
        let cli =
            Cli::try_parse_from(["backoffice-seed", "--excel", "b.xlsx", "--out", "x.sql"]).unwrap();
        assert_eq!(cli.out, Some(PathBuf::from("x.sql")));
    }
}
