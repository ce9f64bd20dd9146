use hybridchess::agents::MlAgent;
use hybridchess::network::ChessNet;
use std::fs::File;
use std::io::Write;

/// Small net with every parameter set to a distinct deterministic value.
fn patterned_net() -> ChessNet {
    let mut net = ChessNet::with_filters(2, 3);
    let mut counter = 0.0f32;
    for block in [
        net.conv1_w.iter_mut().collect::<Vec<_>>(),
        net.conv1_b.iter_mut().collect(),
        net.conv2_w.iter_mut().collect(),
        net.conv2_b.iter_mut().collect(),
        net.policy_w.iter_mut().collect(),
        net.policy_b.iter_mut().collect(),
        net.value_w.iter_mut().collect(),
        net.value_b.iter_mut().collect(),
    ] {
        for v in block {
            *v = counter * 0.001;
            counter += 1.0;
        }
    }
    net
}

#[test]
fn checkpoint_round_trip() {
    let net = patterned_net();
    let path = "target/chessnet_roundtrip.net";
    net.save(path).expect("save checkpoint");

    let loaded = ChessNet::load(path).expect("load checkpoint");
    assert_eq!(loaded.conv_filters(), (2, 3));
    assert_eq!(loaded.conv1_w, net.conv1_w);
    assert_eq!(loaded.conv1_b, net.conv1_b);
    assert_eq!(loaded.conv2_w, net.conv2_w);
    assert_eq!(loaded.conv2_b, net.conv2_b);
    assert_eq!(loaded.policy_w, net.policy_w);
    assert_eq!(loaded.policy_b, net.policy_b);
    assert_eq!(loaded.value_w, net.value_w);
    assert_eq!(loaded.value_b, net.value_b);
}

#[test]
fn agent_loads_from_a_saved_checkpoint() {
    let path = "target/chessnet_agent.net";
    ChessNet::with_filters(1, 1).save(path).expect("save checkpoint");
    let agent = MlAgent::new(path);
    assert!(agent.is_enabled());
}

#[test]
fn bad_magic_is_rejected() {
    let path = "target/chessnet_badmagic.net";
    let mut f = File::create(path).unwrap();
    f.write_all(b"NOTANET!").unwrap();
    f.write_all(&1u32.to_le_bytes()).unwrap();
    drop(f);
    assert!(ChessNet::load(path).is_err());
}

#[test]
fn truncated_checkpoint_is_rejected() {
    let path = "target/chessnet_truncated.net";
    let mut f = File::create(path).unwrap();
    f.write_all(b"HYCNET01").unwrap();
    f.write_all(&1u32.to_le_bytes()).unwrap(); // version
    f.write_all(&12u32.to_le_bytes()).unwrap(); // planes
    f.write_all(&2u32.to_le_bytes()).unwrap(); // conv1
    f.write_all(&3u32.to_le_bytes()).unwrap(); // conv2
    f.write_all(&4096u32.to_le_bytes()).unwrap(); // policy size
    // weight blocks missing entirely
    drop(f);
    assert!(ChessNet::load(path).is_err());
}

#[test]
fn wrong_plane_count_is_rejected() {
    let path = "target/chessnet_badplanes.net";
    let mut f = File::create(path).unwrap();
    f.write_all(b"HYCNET01").unwrap();
    f.write_all(&1u32.to_le_bytes()).unwrap();
    f.write_all(&16u32.to_le_bytes()).unwrap(); // encoder produces 12
    f.write_all(&2u32.to_le_bytes()).unwrap();
    f.write_all(&3u32.to_le_bytes()).unwrap();
    f.write_all(&4096u32.to_le_bytes()).unwrap();
    drop(f);
    assert!(ChessNet::load(path).is_err());
}
