use anyhow::Result;

/// Print the OpenAPI document for the API as JSON.
fn main() -> Result<()> {
    let spec = konto::api::openapi();
    println!("{}", spec.to_pretty_json()?);
    Ok(())
}
