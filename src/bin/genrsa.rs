//! Generates an RSA key and prints it as a PEM PKCS#8 block.

use std::process::ExitCode;

use rsagen::{pem, DevUrandom, PrimeEngine, Result, RsaPrivateKey};

const MIN_BITS: usize = 1024;

fn generate(bits: usize) -> Result<String> {
    let mut rng = DevUrandom::new()?;
    let mut engine = PrimeEngine::new(&mut rng)?;
    let key = RsaPrivateKey::generate(&mut engine, &mut rng, bits, true)?;
    Ok(pem::encode("RSA PRIVATE KEY", &key.asn1_private_key_info()?))
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("genrsa");

    let bits = args.get(1).and_then(|arg| arg.parse::<usize>().ok());
    let bits = match bits {
        Some(bits) if bits >= MIN_BITS => bits,
        _ => {
            eprintln!("Usage: {} keysize (>= {})", program, MIN_BITS);
            return ExitCode::FAILURE;
        }
    };

    match generate(bits) {
        Ok(pem) => {
            print!("{}", pem);
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{}: {}", program, err);
            ExitCode::FAILURE
        }
    }
}
