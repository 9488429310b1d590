use std::sync::{Arc, Mutex};

use chainkit::{capability, ConfigError, Core, CoreError, Module, NetworkModule};
use evm_network::config::{DEFAULT_EVM_CHAIN, EVM_AUTO_CONNECT};
use evm_network::module::MOCK_ACCOUNT;
use evm_network::{EvmError, EvmEvent, EvmEventKind, EvmNetwork};
use serde_json::json;

fn core_with_evm() -> (Core, Arc<EvmNetwork>) {
    let core = Core::new();
    let evm = EvmNetwork::create(&core);
    core.register_module(evm.clone()).unwrap();
    (core, evm)
}

fn record(evm: &EvmNetwork, kinds: &[EvmEventKind]) -> Arc<Mutex<Vec<EvmEvent>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    for &kind in kinds {
        let sink = seen.clone();
        let _ = evm.listen(kind, move |e| {
            sink.lock().unwrap().push(e.clone());
            Ok(())
        });
    }
    seen
}

#[test]
fn setup_registers_keys_with_defaults() {
    let (core, _evm) = core_with_evm();

    assert_eq!(core.config().get(&DEFAULT_EVM_CHAIN).unwrap(), "0x1");
    assert!(!core.config().get(&EVM_AUTO_CONNECT).unwrap());

    let err = core
        .config()
        .set(&DEFAULT_EVM_CHAIN, "mainnet".to_string())
        .unwrap_err();
    assert!(matches!(err, ConfigError::InvalidConfigValue { ref key, .. } if key == "defaultEvmChain"));
    assert_eq!(core.config().get(&DEFAULT_EVM_CHAIN).unwrap(), "0x1");
}

#[test]
fn resolves_as_network_capability() {
    let (core, _evm) = core_with_evm();

    let module = core.get_module_by_capability(capability::NETWORK).unwrap();
    assert_eq!(module.name(), "evm");

    let typed = core
        .get_module_by_capability_as::<EvmNetwork>(capability::NETWORK)
        .unwrap();
    assert!(!typed.is_connected());
}

#[test]
fn signs_through_the_network_contract() {
    let (core, evm) = core_with_evm();
    let network = core.get_network("evm").unwrap();
    assert!(!network.is_connected());
    assert!(network.sign_message("data").is_err());

    evm.connect(None).unwrap();
    let found = core.find_network().unwrap();
    assert!(found.is_connected());
    assert_eq!(
        found.sign_message("data").unwrap(),
        evm.sign_message("data").unwrap()
    );
}

#[test]
fn connect_emits_connecting_then_connected() {
    let (_core, evm) = core_with_evm();
    let seen = record(
        &evm,
        &[EvmEventKind::Connecting, EvmEventKind::Connected],
    );

    let connection = evm.connect(Some("0x3")).unwrap();
    assert_eq!(connection.chain, "0x3");
    assert_eq!(connection.account, MOCK_ACCOUNT);
    assert!(evm.is_connected());

    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            EvmEvent::Connecting {
                chain: "0x3".to_string()
            },
            EvmEvent::Connected {
                account: MOCK_ACCOUNT.to_string(),
                chain: "0x3".to_string()
            },
        ]
    );
}

#[test]
fn connect_without_chain_uses_configured_default() {
    let (core, evm) = core_with_evm();
    core.config()
        .set(&DEFAULT_EVM_CHAIN, "0x89".to_string())
        .unwrap();

    assert_eq!(evm.connect(None).unwrap().chain, "0x89");
}

#[test]
fn connect_rejects_bad_chain_without_events() {
    let (_core, evm) = core_with_evm();
    let seen = record(&evm, &[EvmEventKind::Connecting]);

    assert_eq!(
        evm.connect(Some("ropsten")),
        Err(EvmError::InvalidChain("ropsten".to_string()))
    );
    assert!(!evm.is_connected());
    assert!(seen.lock().unwrap().is_empty());
}

#[test]
fn disconnect_emits_only_when_connected() {
    let (_core, evm) = core_with_evm();
    let seen = record(&evm, &[EvmEventKind::Disconnected]);

    assert!(!evm.disconnect());
    evm.connect(None).unwrap();
    assert!(evm.disconnect());
    assert!(!evm.is_connected());

    assert_eq!(*seen.lock().unwrap(), vec![EvmEvent::Disconnected]);
}

#[test]
fn signing_requires_a_connection() {
    let (_core, evm) = core_with_evm();
    assert_eq!(evm.sign_message("data"), Err(EvmError::NotConnected));

    evm.connect(None).unwrap();
    let sig = evm.sign_message("data").unwrap();
    assert!(sig.starts_with("0x"));
    assert_eq!(sig, evm.sign_message("data").unwrap());
}

#[tokio::test]
async fn start_emits_initialized_and_stays_disconnected_by_default() {
    let (core, evm) = core_with_evm();
    let seen = record(&evm, &[EvmEventKind::Initialized, EvmEventKind::Connected]);

    core.start().await.unwrap();

    assert_eq!(*seen.lock().unwrap(), vec![EvmEvent::Initialized]);
    assert!(!evm.is_connected());
}

#[tokio::test]
async fn auto_connect_on_start() {
    let (core, evm) = core_with_evm();
    core.config()
        .merge([("evmAutoConnect", json!(true)), ("defaultEvmChain", json!("0x5"))])
        .unwrap();

    core.start().await.unwrap();

    assert_eq!(evm.connection().unwrap().chain, "0x5");
}

#[test]
fn second_instance_is_rejected() {
    let (core, _evm) = core_with_evm();
    let again = EvmNetwork::create(&core);

    assert!(matches!(
        core.register_module(again),
        Err(CoreError::ModuleAlreadyRegistered(ref n)) if n == "evm"
    ));
}

#[test]
fn cleanup_drops_listeners() {
    let (_core, evm) = core_with_evm();
    let seen = record(&evm, &[EvmEventKind::Connected]);

    evm.cleanup();
    evm.connect(None).unwrap();
    assert!(seen.lock().unwrap().is_empty());
}
