// ==========================================
// Synthetic registry extract generator
// ==========================================
// Writes a full extract set (code.csv … denomination.csv) for
// manual volume runs of `registry-ingest refresh`.
// Deterministic: the same --count always yields the same files.
// Every file carries a few deliberately bad rows (missing keys,
// duplicates, orphans, unparseable dates).
// ==========================================

use clap::Parser;
use csv::Writer;
use std::error::Error;
use std::fs::File;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "generate_test_data")]
#[command(about = "Generate a synthetic business-registry extract set")]
struct Args {
    /// Output directory (created if missing)
    #[arg(short, long, default_value = "tests/fixtures/generated")]
    out: PathBuf,

    /// Number of enterprises; other files scale from it
    #[arg(short, long, default_value_t = 10_000)]
    count: usize,
}

const NACE_CODES: &[&str] = &["62010", "47110", "56101", "41201", "86210", "69201"];
const JURIDICAL_FORMS: &[&str] = &["014", "015", "016", "116", "417", "610"];
const CONTACT_TYPES: &[&str] = &["TEL", "EMAIL", "WEB"];
const STREETS: &[&str] = &["Rue Haute", "Avenue Louise", "Grand-Place", "Meir", "Kouter"];

fn enterprise_number(index: usize) -> String {
    let digits = format!("{:010}", 200_000_000 + index);
    format!("{}.{}.{}", &digits[0..4], &digits[4..7], &digits[7..10])
}

fn establishment_number(index: usize) -> String {
    let digits = format!("{:010}", 2_000_000_000u64 + index as u64);
    format!(
        "{}.{}.{}.{}",
        &digits[0..1],
        &digits[1..4],
        &digits[4..7],
        &digits[7..10]
    )
}

/// dd-mm-yyyy, as the registry publishes it
fn start_date(index: usize) -> String {
    format!(
        "{:02}-{:02}-{}",
        1 + index % 28,
        1 + (index / 28) % 12,
        1950 + index % 70
    )
}

fn create_writer(dir: &Path, name: &str, header: &[&str]) -> Result<Writer<File>, Box<dyn Error>> {
    let mut wtr = Writer::from_writer(File::create(dir.join(name))?);
    wtr.write_record(header)?;
    Ok(wtr)
}

fn generate_codes(dir: &Path) -> Result<usize, Box<dyn Error>> {
    let mut wtr = create_writer(dir, "code.csv", &["Category", "Code", "Language", "Description"])?;
    let mut rows = 0;

    for code in NACE_CODES.iter().copied() {
        for language in ["FR", "NL"] {
            // same code in two languages: counted as a duplicate on load
            let description = format!("Activity {}", code);
            wtr.write_record(["Nace2008", code, language, description.as_str()])?;
            rows += 1;
        }
    }
    for (code, description) in [("AC", "Active"), ("ST", "Stopped")] {
        wtr.write_record(["Status", code, "FR", description])?;
        rows += 1;
    }

    wtr.flush()?;
    Ok(rows)
}

fn generate_enterprises(dir: &Path, count: usize) -> Result<usize, Box<dyn Error>> {
    let mut wtr = create_writer(
        dir,
        "enterprise.csv",
        &[
            "EnterpriseNumber",
            "Status",
            "JuridicalSituation",
            "TypeOfEnterprise",
            "JuridicalFormCAC",
            "JuridicalForm",
            "StartDate",
        ],
    )?;

    for i in 0..count {
        let number = if i % 97 == 96 {
            String::new()
        } else {
            enterprise_number(i)
        };
        let date = if i % 251 == 250 {
            "31-02-2001".to_string()
        } else {
            start_date(i)
        };
        wtr.write_record([
            number.as_str(),
            if i % 10 == 0 { "ST" } else { "AC" },
            "000",
            if i % 3 == 0 { "1" } else { "2" },
            "",
            JURIDICAL_FORMS[i % JURIDICAL_FORMS.len()],
            date.as_str(),
        ])?;
    }

    wtr.flush()?;
    Ok(count)
}

fn generate_establishments(dir: &Path, count: usize) -> Result<usize, Box<dyn Error>> {
    let mut wtr = create_writer(
        dir,
        "establishment.csv",
        &["EstablishmentNumber", "StartDate", "EnterpriseNumber"],
    )?;

    for i in 0..count {
        // past the last enterprise: orphan
        let parent = if i % 101 == 100 {
            enterprise_number(count + i)
        } else {
            enterprise_number(i)
        };
        wtr.write_record([establishment_number(i), start_date(i), parent])?;
    }

    wtr.flush()?;
    Ok(count)
}

fn generate_activities(dir: &Path, count: usize) -> Result<usize, Box<dyn Error>> {
    let mut wtr = create_writer(
        dir,
        "activity.csv",
        &["EntityNumber", "ActivityGroup", "NaceVersion", "NaceCode", "Classification"],
    )?;
    let mut rows = 0;

    for i in 0..count {
        let entity = if i % 4 == 3 {
            establishment_number(i)
        } else {
            enterprise_number(i)
        };
        let nace = if i % 211 == 210 {
            "00000"
        } else {
            NACE_CODES[i % NACE_CODES.len()]
        };
        let record = [entity.as_str(), "006", "2008", nace, "MAIN"];
        wtr.write_record(record)?;
        rows += 1;

        if i % 53 == 0 {
            wtr.write_record(record)?;
            rows += 1;
        }
    }

    wtr.flush()?;
    Ok(rows)
}

fn generate_addresses(dir: &Path, count: usize) -> Result<usize, Box<dyn Error>> {
    let mut wtr = create_writer(
        dir,
        "address.csv",
        &[
            "EntityNumber",
            "TypeOfAddress",
            "CountryFR",
            "Zipcode",
            "StreetFR",
            "HouseNumber",
            "Box",
            "DateStrikingOff",
        ],
    )?;

    for i in 0..count {
        let striking_off = if i % 50 == 0 { start_date(i + 7) } else { String::new() };
        wtr.write_record([
            enterprise_number(i),
            "REGO".to_string(),
            String::new(),
            format!("{}", 1000 + (i * 37) % 9000),
            STREETS[i % STREETS.len()].to_string(),
            format!("{}", 1 + i % 250),
            if i % 7 == 0 { "A".to_string() } else { String::new() },
            striking_off,
        ])?;
    }

    wtr.flush()?;
    Ok(count)
}

fn generate_contacts(dir: &Path, count: usize) -> Result<usize, Box<dyn Error>> {
    let mut wtr = create_writer(
        dir,
        "contact.csv",
        &["EntityNumber", "EntityContact", "ContactType", "Value"],
    )?;
    let mut rows = 0;

    // roughly one enterprise in three publishes a contact
    for i in (0..count).step_by(3) {
        let kind = CONTACT_TYPES[(i / 3) % CONTACT_TYPES.len()];
        let value = match kind {
            "TEL" => format!("02 {:03} {:02} {:02}", i % 1000, i % 100, (i / 100) % 100),
            "EMAIL" => format!("info{}@example.test", i),
            _ => format!("www.company{}.test", i),
        };
        wtr.write_record([enterprise_number(i).as_str(), "ENT", kind, value.as_str()])?;
        rows += 1;
    }

    wtr.flush()?;
    Ok(rows)
}

fn generate_denominations(dir: &Path, count: usize) -> Result<usize, Box<dyn Error>> {
    let mut wtr = create_writer(
        dir,
        "denomination.csv",
        &["EntityNumber", "Language", "TypeOfDenomination", "Denomination"],
    )?;

    for i in 0..count {
        // embedded delimiter and quotes exercise the CSV quoting path
        let name = if i % 9 == 0 {
            format!("Company {}, \"Holding\"", i)
        } else {
            format!("Company {}", i)
        };
        wtr.write_record([
            enterprise_number(i).as_str(),
            if i % 2 == 0 { "1" } else { "2" },
            "001",
            name.as_str(),
        ])?;
    }

    wtr.flush()?;
    Ok(count)
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    std::fs::create_dir_all(&args.out)?;
    let dir = args.out.as_path();
    let count = args.count;

    println!("Generating registry extract ({} enterprises) in {}", count, dir.display());

    let files = [
        ("code.csv", generate_codes(dir)?),
        ("enterprise.csv", generate_enterprises(dir, count)?),
        ("establishment.csv", generate_establishments(dir, count / 2)?),
        ("activity.csv", generate_activities(dir, count)?),
        ("address.csv", generate_addresses(dir, count)?),
        ("contact.csv", generate_contacts(dir, count)?),
        ("denomination.csv", generate_denominations(dir, count)?),
    ];

    for (name, rows) in files {
        println!("  {:<18} {:>9} rows", name, rows);
    }
    Ok(())
}
