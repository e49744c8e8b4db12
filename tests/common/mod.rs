use std::fs::File;
use std::io::Error;
use std::path::Path;

/// Writes a two-product catalog: `p1` (1.99 USD) and `p2` (4.50 EUR
/// subscription).
pub fn write_catalog(path: &Path) -> Result<(), Error> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new().from_writer(file);

    wtr.write_record(&[
        "identifier",
        "kind",
        "title",
        "description",
        "price",
        "currency_code",
        "formatted_price",
        "locale_tag",
    ])?;
    wtr.write_record(&["p1", "product", "One", "First product", "1.99", "USD", "$1.99", "en_US"])?;
    wtr.write_record(&[
        "p2",
        "subscription",
        "Two",
        "Second product",
        "4.50",
        "EUR",
        "\u{20ac}4.50",
        "de_DE",
    ])?;

    wtr.flush()?;
    Ok(())
}

/// Writes a script file from `steps`, each given as `(op, arg)`.
pub fn write_script(path: &Path, steps: &[(&str, &str)]) -> Result<(), Error> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new().from_writer(file);

    wtr.write_record(&["op", "arg"])?;
    for (op, arg) in steps {
        wtr.write_record(&[*op, *arg])?;
    }

    wtr.flush()?;
    Ok(())
}
