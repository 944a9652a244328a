// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Consumer example for the `dgc` crates.
//!
//! Signs a payload into an `HC1:` transport string, or decodes and verifies
//! one against a set of trusted DER certificates.

use std::sync::Arc;
use std::time::{Duration, UNIX_EPOCH};

use dgc::{DgcDecoder, DgcEncoder, DgcSigner, SignerCredential, StaticCertificateProvider};

/// Read a file to bytes or exit with a clear error.
fn read(path: &str) -> Vec<u8> {
    std::fs::read(path).unwrap_or_else(|e| {
        eprintln!("failed to read {path}: {e}");
        std::process::exit(2);
    })
}

fn get_arg_value(args: &[String], name: &str) -> Option<String> {
    let mut i = 0usize;
    while i < args.len() {
        if args[i] == name {
            return args.get(i + 1).cloned();
        }
        i += 1;
    }
    None
}

fn get_arg_values(args: &[String], name: &str) -> Vec<String> {
    args.windows(2)
        .filter(|w| w[0] == name)
        .map(|w| w[1].clone())
        .collect()
}

fn usage_and_exit(exe: &str) -> ! {
    eprintln!("Usage:");
    eprintln!("  {exe} sign --key <pkcs8 der> --cert <der> --payload <file> --expires <unix seconds>");
    eprintln!("  {exe} verify --hc1 <file> --cert <der> [--cert <der> ...]");
    std::process::exit(2);
}

fn fail(context: &str, e: dgc::DgcError) -> ! {
    eprintln!("{context}: {e}");
    std::process::exit(if e.is_expiration() { 4 } else { 3 });
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let exe = args.first().map(|s| s.as_str()).unwrap_or("dgc_hello_world");
    let mode = args.get(1).map(|s| s.as_str()).unwrap_or("");

    if mode == "sign" {
        let key_path = get_arg_value(&args, "--key").unwrap_or_default();
        let cert_path = get_arg_value(&args, "--cert").unwrap_or_default();
        let payload_path = get_arg_value(&args, "--payload").unwrap_or_default();
        let expires = get_arg_value(&args, "--expires").and_then(|s| s.parse::<u64>().ok());

        let (Some(expires), false, false, false) =
            (expires, key_path.is_empty(), cert_path.is_empty(), payload_path.is_empty())
        else {
            usage_and_exit(exe);
        };

        let credential = SignerCredential::from_pkcs8_der(&read(&key_path), &read(&cert_path))
            .unwrap_or_else(|e| fail("loading credential failed", e));
        let signer = DgcSigner::new(credential).unwrap_or_else(|e| fail("creating signer failed", e));
        println!("country: {}", signer.signer_country());
        println!("kid: {}", signer.kid());
        println!("algorithm: {:?}", signer.algorithm());

        let transport = DgcEncoder::new(signer)
            .sign_and_encode(&read(&payload_path), UNIX_EPOCH + Duration::from_secs(expires))
            .unwrap_or_else(|e| fail("signing failed", e));
        println!("{transport}");
        return;
    }

    if mode == "verify" {
        let hc1_path = get_arg_value(&args, "--hc1").unwrap_or_default();
        let certs = get_arg_values(&args, "--cert");
        if hc1_path.is_empty() || certs.is_empty() {
            usage_and_exit(exe);
        }

        let mut provider = StaticCertificateProvider::new();
        for path in &certs {
            if let Err(e) = provider.add_certificate(&read(path)) {
                eprintln!("{path}: {e}");
                std::process::exit(2);
            }
        }

        // Space is a Base45 character; only line endings are dropped.
        let hc1 = read(&hc1_path);
        let end = hc1.iter().rposition(|b| *b != b'\n' && *b != b'\r').map_or(0, |i| i + 1);
        let decoder = DgcDecoder::new(Arc::new(provider));
        let result = decoder
            .decode_to_result(&hc1[..end])
            .unwrap_or_else(|e| fail("verification failed", e));

        println!("issuer: {}", result.issuer.as_deref().unwrap_or("<none>"));
        println!("issued_at: {:?}", result.issued_at);
        println!("expiration: {:?}", result.expiration);
        println!("payload: {} bytes", result.payload.len());
        return;
    }

    usage_and_exit(exe);
}
