//! Integration tests for the wallet service

use seedvault_wallet::scanner::derive_entry;
use seedvault_wallet::{
    new_seed, Address, AddressUxOuts, BalancePair, CoinType, CreateTransactionParams, CryptoType,
    ErrorKind, Feature, IntegrityError, OracleError, Options, Receiver, Secret, Service,
    ServiceConfig, UxOut, Wallet, WalletError, WalletParams, WalletState, WalletType,
};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use tempfile::tempdir;
use zeroize::Zeroizing;

const SEED: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";
const PWD: &[u8] = b"hunter2";

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn config(dir: &Path) -> ServiceConfig {
    let mut config = ServiceConfig::with_wallet_dir(dir);
    config.crypto_type = CryptoType::Sha256Xor;
    config
}

fn service(dir: &Path) -> Service {
    init_logger();
    Service::new(config(dir)).unwrap()
}

fn opts(seed: &str) -> Options {
    Options {
        seed: Some(Secret::new(seed)),
        label: "savings".to_string(),
        ..Default::default()
    }
}

fn encrypted_opts(seed: &str) -> Options {
    Options {
        encrypt: true,
        password: Zeroizing::new(PWD.to_vec()),
        ..opts(seed)
    }
}

fn snapshot(service: &Service, id: &str) -> String {
    serde_json::to_string(&service.get_wallet(id).unwrap()).unwrap()
}

#[test]
fn test_create_persists_and_reloads() {
    let dir = tempdir().unwrap();
    let created = {
        let service = service(dir.path());
        let mut options = opts(SEED);
        options.generate_n = 3;
        service.create_wallet(Some("a.wlt"), options, None).unwrap()
    };

    let service = service(dir.path());
    let loaded = service.get_wallet("a.wlt").unwrap();
    assert_eq!(loaded, created);
    assert_eq!(loaded.entries().len(), 3);
    assert_eq!(
        service.get_skycoin_addresses("a.wlt").unwrap(),
        created.addresses()
    );
}

#[test]
fn test_seed_conflict_leaves_store_and_disk_unchanged() {
    let dir = tempdir().unwrap();
    let service = service(dir.path());
    service.create_wallet(Some("a.wlt"), opts(SEED), None).unwrap();

    let err = service
        .create_wallet(Some("b.wlt"), encrypted_opts(SEED), None)
        .unwrap_err();
    assert!(matches!(err, WalletError::SeedConflict(ref id) if id == "a.wlt"));
    assert_eq!(err.kind(), ErrorKind::SeedConflict);

    assert_eq!(service.get_wallets().unwrap().len(), 1);
    assert!(!dir.path().join("b.wlt").exists());
    assert!(!service.contains("b.wlt").unwrap());
}

#[test]
fn test_new_addresses_plain() {
    let dir = tempdir().unwrap();
    let service = service(dir.path());
    service.create_wallet(Some("a.wlt"), opts(SEED), None).unwrap();

    let added = service.new_addresses("a.wlt", b"", 4).unwrap();
    assert_eq!(added.len(), 4);

    let all = service.get_skycoin_addresses("a.wlt").unwrap();
    assert_eq!(all.len(), 5);
    assert!(!added.contains(&all[0]));
    for (index, address) in all.iter().enumerate() {
        let entry = derive_entry(&Secret::new(SEED), index as u32, CoinType::Skycoin).unwrap();
        assert_eq!(&entry.address, address);
    }

    let err = service.new_addresses("a.wlt", PWD, 1).unwrap_err();
    assert!(matches!(err, WalletError::PasswordNotExpected));
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(
        service.new_addresses("a.wlt", b"", 0).unwrap_err().kind(),
        ErrorKind::Validation
    );
    assert!(matches!(
        service.new_addresses("missing.wlt", b"", 1),
        Err(WalletError::NotFound(_))
    ));

    // Persisted before being published
    let reloaded = Service::new(config(dir.path())).unwrap();
    assert_eq!(reloaded.get_skycoin_addresses("a.wlt").unwrap(), all);
}

#[test]
fn test_new_addresses_encrypted() {
    let dir = tempdir().unwrap();
    let service = service(dir.path());
    service
        .create_wallet(Some("a.wlt"), encrypted_opts(SEED), None)
        .unwrap();
    let before = snapshot(&service, "a.wlt");

    assert!(matches!(
        service.new_addresses("a.wlt", b"", 2),
        Err(WalletError::MissingPassword)
    ));
    assert!(matches!(
        service.new_addresses("a.wlt", b"wrong", 2),
        Err(WalletError::AuthenticationFailure)
    ));
    assert_eq!(snapshot(&service, "a.wlt"), before);

    let added = service.new_addresses("a.wlt", PWD, 2).unwrap();
    assert_eq!(added.len(), 2);

    let wallet = service.get_wallet("a.wlt").unwrap();
    assert!(wallet.is_encrypted());
    assert_eq!(wallet.entries().len(), 3);
    assert!(wallet.seed().is_none());

    let unlocked = wallet.unlock(PWD).unwrap();
    assert!(unlocked.entries().iter().all(|e| e.secret_key.is_some()));
}

#[test]
fn test_encrypt_decrypt_roundtrip() {
    let dir = tempdir().unwrap();
    let service = service(dir.path());
    let original = service.create_wallet(Some("a.wlt"), opts(SEED), None).unwrap();

    let encrypted = service.encrypt_wallet("a.wlt", PWD).unwrap();
    assert!(encrypted.is_encrypted());
    assert!(encrypted.seed().is_none());
    assert_eq!(encrypted.crypto_type(), CryptoType::Sha256Xor);
    assert!(service.get_wallet("a.wlt").unwrap().is_encrypted());

    let on_disk = fs::read_to_string(dir.path().join("a.wlt")).unwrap();
    assert!(!on_disk.contains("abandon"));

    assert!(matches!(
        service.encrypt_wallet("a.wlt", PWD),
        Err(WalletError::AlreadyInState(WalletState::Encrypted))
    ));
    assert!(matches!(
        service.decrypt_wallet("a.wlt", b"wrong"),
        Err(WalletError::AuthenticationFailure)
    ));

    let decrypted = service.decrypt_wallet("a.wlt", PWD).unwrap();
    assert!(!decrypted.is_encrypted());
    assert_eq!(decrypted.entries(), original.entries());
    assert_eq!(decrypted.seed(), original.seed());
    assert!(matches!(
        service.decrypt_wallet("a.wlt", PWD),
        Err(WalletError::AlreadyInState(WalletState::NotEncrypted))
    ));
}

#[test]
fn test_argon2_encryption() {
    let dir = tempdir().unwrap();
    init_logger();
    let mut config = ServiceConfig::with_wallet_dir(dir.path());
    config.enable_seed_api = true;
    let service = Service::new(config).unwrap();

    let wallet = service
        .create_wallet(Some("a.wlt"), encrypted_opts(SEED), None)
        .unwrap();
    assert_eq!(wallet.crypto_type(), CryptoType::Argon2Aes256Gcm);

    let seed = service.get_wallet_seed("a.wlt", PWD).unwrap();
    assert_eq!(seed.expose(), SEED);
    assert!(matches!(
        service.get_wallet_seed("a.wlt", b"wrong"),
        Err(WalletError::AuthenticationFailure)
    ));
}

#[test]
fn test_view_secrets_never_changes_stored_wallet() {
    let dir = tempdir().unwrap();
    let service = service(dir.path());
    service
        .create_wallet(Some("a.wlt"), encrypted_opts(SEED), None)
        .unwrap();
    let before = snapshot(&service, "a.wlt");
    let file_before = fs::read(dir.path().join("a.wlt")).unwrap();

    let count = service
        .view_secrets("a.wlt", PWD, |w| {
            assert!(w.seed().is_some());
            Ok(w.entries().len())
        })
        .unwrap();
    assert_eq!(count, 1);

    let failed: seedvault_wallet::Result<()> = service.view_secrets("a.wlt", PWD, |_| {
        Err(WalletError::Validation("callback failed".into()))
    });
    assert!(failed.is_err());

    assert!(matches!(
        service.view_secrets("a.wlt", b"wrong", |_| Ok(())),
        Err(WalletError::AuthenticationFailure)
    ));

    assert_eq!(snapshot(&service, "a.wlt"), before);
    assert_eq!(fs::read(dir.path().join("a.wlt")).unwrap(), file_before);
}

#[test]
fn test_update_secrets() {
    let dir = tempdir().unwrap();
    let service = service(dir.path());
    service
        .create_wallet(Some("a.wlt"), encrypted_opts(SEED), None)
        .unwrap();
    let before = snapshot(&service, "a.wlt");

    let failed = service.update_secrets("a.wlt", PWD, |w| {
        w.generate_addresses(3)?;
        Err(WalletError::Validation("callback failed".into()))
    });
    assert!(failed.is_err());
    assert_eq!(snapshot(&service, "a.wlt"), before);

    service
        .update_secrets("a.wlt", PWD, |w| {
            w.generate_addresses(3)?;
            Ok(())
        })
        .unwrap();

    let wallet = service.get_wallet("a.wlt").unwrap();
    assert!(wallet.is_encrypted());
    assert_eq!(wallet.entries().len(), 4);
    assert_eq!(wallet.unlock(PWD).unwrap().entries().len(), 4);

    let plain_dir = tempdir().unwrap();
    let plain = self::service(plain_dir.path());
    plain.create_wallet(Some("p.wlt"), opts(SEED), None).unwrap();
    assert!(matches!(
        plain.update_secrets("p.wlt", PWD, |_| Ok(())),
        Err(WalletError::PasswordNotExpected)
    ));
    plain
        .update_secrets("p.wlt", b"", |w| {
            w.generate_addresses(1)?;
            Ok(())
        })
        .unwrap();
    assert_eq!(plain.get_wallet("p.wlt").unwrap().entries().len(), 2);

    let reloaded = self::service(plain_dir.path());
    assert_eq!(reloaded.get_wallet("p.wlt").unwrap().entries().len(), 2);

    let seed = plain
        .view_secrets("p.wlt", b"", |w| Ok(w.seed().map(|s| s.expose().to_string())))
        .unwrap();
    assert_eq!(seed.as_deref(), Some(SEED));
    assert!(matches!(
        plain.view_secrets("p.wlt", PWD, |_| Ok(())),
        Err(WalletError::PasswordNotExpected)
    ));
}

#[test]
fn test_update_and_label() {
    let dir = tempdir().unwrap();
    let service = service(dir.path());
    service.create_wallet(Some("a.wlt"), opts(SEED), None).unwrap();

    service.update_wallet_label("a.wlt", "travel").unwrap();
    service
        .update("a.wlt", |w| {
            w.set_timestamp(42);
            Ok(())
        })
        .unwrap();

    let label = service.view("a.wlt", |w| Ok(w.label().to_string())).unwrap();
    assert_eq!(label, "travel");

    let reloaded = Service::new(config(dir.path())).unwrap();
    let wallet = reloaded.get_wallet("a.wlt").unwrap();
    assert_eq!(wallet.label(), "travel");
    assert_eq!(wallet.timestamp(), 42);
}

#[test]
fn test_failed_save_keeps_previous_state() {
    let dir = tempdir().unwrap();
    let service = service(dir.path());
    service.create_wallet(Some("a.wlt"), opts(SEED), None).unwrap();
    let before = snapshot(&service, "a.wlt");

    // A non-empty directory in place of the file makes the rename fail
    let path = dir.path().join("a.wlt");
    fs::remove_file(&path).unwrap();
    fs::create_dir(&path).unwrap();
    fs::write(path.join("keep"), b"x").unwrap();

    let err = service.encrypt_wallet("a.wlt", PWD).unwrap_err();
    assert!(matches!(err, WalletError::Persistence(_)));
    assert_eq!(err.kind(), ErrorKind::Persistence);
    assert_eq!(snapshot(&service, "a.wlt"), before);
    assert!(!service.get_wallet("a.wlt").unwrap().is_encrypted());

    let err = service.new_addresses("a.wlt", b"", 2).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Persistence);
    assert_eq!(snapshot(&service, "a.wlt"), before);
    assert!(!dir.path().join("a.wlt.tmp").exists());

    fs::remove_dir_all(&path).unwrap();
    assert_eq!(service.new_addresses("a.wlt", b"", 2).unwrap().len(), 2);
    assert_eq!(service.get_wallet("a.wlt").unwrap().entries().len(), 3);
}

#[test]
fn test_failed_create_publishes_nothing() {
    let dir = tempdir().unwrap();
    let service = service(dir.path());
    service.create_wallet(Some("a.wlt"), opts(SEED), None).unwrap();

    // The temporary file cannot be created over a directory
    let tmp = dir.path().join("b.wlt.tmp");
    fs::create_dir(&tmp).unwrap();

    let err = service
        .create_wallet(Some("b.wlt"), opts("other seed"), None)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Persistence);
    assert!(!service.contains("b.wlt").unwrap());
    assert_eq!(service.get_wallets().unwrap().len(), 1);
    assert!(!dir.path().join("b.wlt").exists());

    // The first address was never claimed
    fs::remove_dir(&tmp).unwrap();
    service
        .create_wallet(Some("b.wlt"), opts("other seed"), None)
        .unwrap();
    assert_eq!(service.get_wallets().unwrap().len(), 2);
}

#[test]
fn test_returned_wallets_are_copies() {
    let dir = tempdir().unwrap();
    let service = service(dir.path());
    service.create_wallet(Some("a.wlt"), opts(SEED), None).unwrap();

    let mut copy = service.get_wallet("a.wlt").unwrap();
    copy.set_label("tampered");
    copy.generate_addresses(2).unwrap();

    let stored = service.get_wallet("a.wlt").unwrap();
    assert_eq!(stored.label(), "savings");
    assert_eq!(stored.entries().len(), 1);
}

#[test]
fn test_recover_wallet() {
    let dir = tempdir().unwrap();
    let service = service(dir.path());
    let mut options = encrypted_opts(SEED);
    options.generate_n = 4;
    service.create_wallet(Some("a.wlt"), options, None).unwrap();
    service
        .update("a.wlt", |w| {
            w.set_timestamp(1_000);
            Ok(())
        })
        .unwrap();
    let addresses = service.get_skycoin_addresses("a.wlt").unwrap();

    let other = new_seed(128).unwrap();
    assert!(matches!(
        service.recover_wallet("a.wlt", &other, b"new"),
        Err(WalletError::RecoveryMismatch)
    ));

    let recovered = service.recover_wallet("a.wlt", SEED, b"new").unwrap();
    assert!(recovered.is_encrypted());
    assert_eq!(recovered.addresses(), addresses);
    assert_eq!(recovered.timestamp(), 1_000);
    assert_eq!(recovered.label(), "savings");
    assert_eq!(recovered.crypto_type(), CryptoType::Sha256Xor);

    let stored = service.get_wallet("a.wlt").unwrap();
    assert!(stored.unlock(b"new").is_ok());
    assert!(matches!(
        stored.unlock(PWD),
        Err(WalletError::AuthenticationFailure)
    ));

    let plain = service.recover_wallet("a.wlt", SEED, b"").unwrap();
    assert!(!plain.is_encrypted());
    assert!(matches!(
        service.recover_wallet("a.wlt", SEED, b""),
        Err(WalletError::AlreadyInState(WalletState::NotEncrypted))
    ));
}

#[test]
fn test_recover_collection_wallet() {
    let dir = tempdir().unwrap();
    let service = service(dir.path());
    let key = derive_entry(&Secret::new("imported"), 0, CoinType::Skycoin).unwrap();
    let options = Options {
        wallet_type: WalletType::Collection,
        import_keys: vec![key.secret_key.clone().unwrap()],
        encrypt: true,
        password: Zeroizing::new(PWD.to_vec()),
        ..Default::default()
    };
    service.create_wallet(Some("c.wlt"), options, None).unwrap();

    let err = service.recover_wallet("c.wlt", "imported", b"").unwrap_err();
    assert!(matches!(err, WalletError::NotDeterministic(_)));
    assert_eq!(err.kind(), ErrorKind::NotDeterministic);

    let other = derive_entry(&Secret::new("other"), 0, CoinType::Skycoin).unwrap();
    let plain = Options {
        wallet_type: WalletType::Collection,
        import_keys: vec![other.secret_key.clone().unwrap()],
        ..Default::default()
    };
    service.create_wallet(Some("p.wlt"), plain, None).unwrap();
    let err = service.recover_wallet("p.wlt", "other", b"").unwrap_err();
    assert!(matches!(
        err,
        WalletError::AlreadyInState(WalletState::NotEncrypted)
    ));
}

#[test]
fn test_startup_rejects_duplicate_first_address() {
    let dir = tempdir().unwrap();
    {
        let service = service(dir.path());
        service.create_wallet(Some("a.wlt"), opts(SEED), None).unwrap();
    }
    fs::copy(dir.path().join("a.wlt"), dir.path().join("b.wlt")).unwrap();

    let err = match Service::new(config(dir.path())) {
        Err(e) => e,
        Ok(_) => panic!("service must not start with duplicate wallets"),
    };
    assert_eq!(err.kind(), ErrorKind::StartupIntegrity);
    assert!(matches!(
        err,
        WalletError::StartupIntegrity(IntegrityError::Duplicate { ref wallet_id, ref existing_id, .. })
            if wallet_id == "b.wlt" && existing_id == "a.wlt"
    ));
}

#[test]
fn test_startup_rejects_empty_wallet() {
    let dir = tempdir().unwrap();
    {
        let service = service(dir.path());
        service.create_wallet(Some("a.wlt"), opts(SEED), None).unwrap();
    }
    let path = dir.path().join("a.wlt");
    let mut json: serde_json::Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
    json["entries"] = serde_json::json!([]);
    fs::write(&path, serde_json::to_vec(&json).unwrap()).unwrap();

    assert!(matches!(
        Service::new(config(dir.path())),
        Err(WalletError::StartupIntegrity(IntegrityError::Empty(ref id))) if id == "a.wlt"
    ));
}

#[test]
fn test_startup_rejects_corrupt_wallet() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("bad.wlt"), b"{ not json").unwrap();

    assert!(matches!(
        Service::new(config(dir.path())),
        Err(WalletError::StartupIntegrity(IntegrityError::Invalid { .. }))
    ));
}

#[test]
fn test_startup_removes_stray_files() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.wlt.tmp"), b"partial").unwrap();
    fs::write(dir.path().join("a.wlt.bak"), b"old").unwrap();

    let service = service(dir.path());
    assert!(service.get_wallets().unwrap().is_empty());
    assert!(!dir.path().join("a.wlt.tmp").exists());
    assert!(!dir.path().join("a.wlt.bak").exists());
}

#[test]
fn test_reload_is_all_or_nothing() {
    let dir = tempdir().unwrap();
    let service = service(dir.path());
    service.create_wallet(Some("a.wlt"), opts(SEED), None).unwrap();

    fs::copy(dir.path().join("a.wlt"), dir.path().join("b.wlt")).unwrap();
    assert_eq!(
        service.reload().unwrap_err().kind(),
        ErrorKind::StartupIntegrity
    );
    assert_eq!(service.get_wallets().unwrap().len(), 1);

    fs::remove_file(dir.path().join("b.wlt")).unwrap();
    service.reload().unwrap();
    assert!(service.contains("a.wlt").unwrap());
}

#[test]
fn test_remove_retires_first_address() {
    let dir = tempdir().unwrap();
    let service = service(dir.path());
    service.create_wallet(Some("a.wlt"), opts(SEED), None).unwrap();

    service.remove("a.wlt").unwrap();
    assert!(matches!(
        service.get_wallet("a.wlt"),
        Err(WalletError::NotFound(_))
    ));
    assert!(matches!(service.remove("a.wlt"), Err(WalletError::NotFound(_))));

    // The same seed may be used again once the wallet is gone
    service.create_wallet(Some("b.wlt"), opts(SEED), None).unwrap();
}

#[test]
fn test_new_seed_wallet_with_empty_oracle() {
    let dir = tempdir().unwrap();
    let service = service(dir.path());

    let seed = new_seed(128).unwrap();
    assert_eq!(seed.split_whitespace().count(), 12);
    assert_eq!(new_seed(256).unwrap().split_whitespace().count(), 24);

    let oracle = |addrs: &[Address]| -> std::result::Result<Vec<BalancePair>, OracleError> {
        Ok(vec![BalancePair::default(); addrs.len()])
    };
    let mut options = opts(&seed);
    options.scan_n = 20;
    let wallet = service
        .create_wallet(None, options, Some(&oracle))
        .unwrap();
    assert_eq!(wallet.entries().len(), 1);
}

#[test]
fn test_oracle_failure_saves_nothing() {
    let dir = tempdir().unwrap();
    let service = service(dir.path());

    let oracle = |_: &[Address]| -> std::result::Result<Vec<BalancePair>, OracleError> {
        Err("connection refused".into())
    };
    let mut options = opts(SEED);
    options.scan_n = 5;
    let err = service
        .create_wallet(Some("a.wlt"), options, Some(&oracle))
        .unwrap_err();

    assert!(matches!(err, WalletError::BalanceOracle(_)));
    assert!(!dir.path().join("a.wlt").exists());
    assert!(service.get_wallets().unwrap().is_empty());
}

fn spendable(wallet: &Wallet) -> AddressUxOuts {
    let address = wallet.first_address().unwrap().clone();
    let mut auxs = AddressUxOuts::new();
    auxs.insert(
        address.clone(),
        vec![UxOut {
            hash: hex::encode([5u8; 32]),
            address,
            coins: 1_000,
            hours: 10,
            time: 1,
        }],
    );
    auxs
}

fn spend(id: &str, password: &[u8]) -> CreateTransactionParams {
    CreateTransactionParams {
        wallet: WalletParams {
            id: id.to_string(),
            password: Zeroizing::new(password.to_vec()),
        },
        to: vec![Receiver {
            address: Address::from_public_key(&[3u8; 32], CoinType::Skycoin),
            coins: 400,
        }],
        fee: 5,
        ..Default::default()
    }
}

#[test]
fn test_create_transaction_password_rules() {
    let dir = tempdir().unwrap();
    let service = service(dir.path());
    let wallet = service
        .create_wallet(Some("a.wlt"), encrypted_opts(SEED), None)
        .unwrap();
    let auxs = spendable(&wallet);

    // Rejected before any output is looked at
    let err = service
        .create_transaction(&spend("a.wlt", b""), &AddressUxOuts::new(), 10)
        .unwrap_err();
    assert!(matches!(err, WalletError::MissingPassword));
    assert_eq!(err.kind(), ErrorKind::Validation);

    let (tx, spent) = service
        .create_transaction(&spend("a.wlt", PWD), &auxs, 10)
        .unwrap();
    tx.verify(CoinType::Skycoin).unwrap();
    assert_eq!(spent.len(), 1);
    assert_eq!(tx.outputs[1].coins, 595);
    assert!(service.get_wallet("a.wlt").unwrap().is_encrypted());

    service.decrypt_wallet("a.wlt", PWD).unwrap();
    assert!(matches!(
        service.create_transaction(&spend("a.wlt", PWD), &auxs, 10),
        Err(WalletError::PasswordNotExpected)
    ));
    assert!(service
        .create_transaction(&spend("a.wlt", b""), &auxs, 10)
        .is_ok());
}

#[test]
fn test_seed_api_rules() {
    let dir = tempdir().unwrap();
    init_logger();
    let service = Service::new(config(dir.path())).unwrap();
    service
        .create_wallet(Some("a.wlt"), encrypted_opts(SEED), None)
        .unwrap();
    assert!(matches!(
        service.get_wallet_seed("a.wlt", PWD),
        Err(WalletError::FeatureDisabled(Feature::SeedApi))
    ));
    drop(service);

    let mut enabled = config(dir.path());
    enabled.enable_seed_api = true;
    let service = Service::new(enabled).unwrap();
    assert_eq!(service.get_wallet_seed("a.wlt", PWD).unwrap().expose(), SEED);

    service.create_wallet(Some("p.wlt"), opts("plain seed"), None).unwrap();
    assert!(matches!(
        service.get_wallet_seed("p.wlt", b""),
        Err(WalletError::AlreadyInState(WalletState::NotEncrypted))
    ));
}

#[test]
fn test_wallet_api_disabled() {
    let dir = tempdir().unwrap();
    let wallet_dir = dir.path().join("wallets");
    let mut config = config(&wallet_dir);
    config.enable_wallet_api = false;
    let service = Service::new(config).unwrap();

    assert!(!service.is_wallet_api_enabled());
    assert!(!wallet_dir.exists());

    let disabled = |e: WalletError| e.kind() == ErrorKind::FeatureDisabled;
    assert!(disabled(service.create_wallet(None, opts(SEED), None).unwrap_err()));
    assert!(disabled(service.get_wallets().unwrap_err()));
    assert!(disabled(service.get_wallet("a.wlt").unwrap_err()));
    assert!(disabled(service.encrypt_wallet("a.wlt", PWD).unwrap_err()));
    assert!(disabled(service.new_addresses("a.wlt", b"", 1).unwrap_err()));
    assert!(disabled(service.remove("a.wlt").unwrap_err()));
    assert!(disabled(service.get_wallet_seed("a.wlt", PWD).unwrap_err()));
    assert!(disabled(service.reload().unwrap_err()));
    assert!(disabled(service.wallet_dir().unwrap_err()));
    assert!(!wallet_dir.exists());
}

#[test]
fn test_concurrent_new_addresses() {
    let dir = tempdir().unwrap();
    let service = Arc::new(service(dir.path()));
    service.create_wallet(Some("a.wlt"), opts(SEED), None).unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let service = Arc::clone(&service);
            thread::spawn(move || {
                for _ in 0..5 {
                    service.new_addresses("a.wlt", b"", 1).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let addresses = service.get_skycoin_addresses("a.wlt").unwrap();
    assert_eq!(addresses.len(), 41);
    let unique: std::collections::HashSet<_> = addresses.iter().collect();
    assert_eq!(unique.len(), 41);

    let reloaded = Service::new(config(dir.path())).unwrap();
    assert_eq!(reloaded.get_skycoin_addresses("a.wlt").unwrap(), addresses);
}
