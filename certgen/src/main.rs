use clap::Parser;
use rcgen::{CertificateParams, DnType, ExtendedKeyUsagePurpose, KeyPair, KeyUsagePurpose};
use rsa::pkcs1::{EncodeRsaPrivateKey, LineEnding};
use rsa::pkcs8::EncodePrivateKey;
use rsa::RsaPrivateKey;

/// Generates a loopback-scoped self-signed RSA certificate/key pair for
/// the metrics pipeline's payload encryption.
/// Not wired into agent/server startup; run once, out of band.
#[derive(Parser, Debug)]
#[command(name = "certgen")]
struct Args {
    /// Where to write the public certificate (fed to --crypto-key on the agent)
    #[arg(long, default_value = "client.pem")]
    cert_out: String,
    /// Where to write the private key (fed to --crypto-key on the server)
    #[arg(long, default_value = "server.pem")]
    key_out: String,
    /// RSA modulus size in bits
    #[arg(long, default_value_t = 2048)]
    key_size: usize,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut rng = rand::thread_rng();
    let private_key = RsaPrivateKey::new(&mut rng, args.key_size)?;

    let pkcs8_pem = private_key.to_pkcs8_pem(LineEnding::LF)?;
    let key_pair = KeyPair::from_pem(pkcs8_pem.as_str())?;

    let mut params = CertificateParams::new(vec!["127.0.0.1".to_string(), "::1".to_string()])?;
    params.distinguished_name.push(DnType::OrganizationName, "metrics-agent");
    params.distinguished_name.push(DnType::CountryName, "NL");
    params.key_usages = vec![KeyUsagePurpose::DigitalSignature];
    params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ClientAuth, ExtendedKeyUsagePurpose::ServerAuth];

    let cert = params.self_signed(&key_pair)?;

    std::fs::write(&args.cert_out, cert.pem())?;
    std::fs::write(&args.key_out, private_key.to_pkcs1_pem(LineEnding::LF)?.as_bytes())?;

    println!("wrote {} and {}", args.cert_out, args.key_out);
    Ok(())
}
