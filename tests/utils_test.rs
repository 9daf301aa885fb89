use playrelay::utils::*;

#[test]
fn test_generate_code_verifier() {
    let verifier = generate_code_verifier();

    // Should be exactly 128 characters
    assert_eq!(verifier.len(), 128);

    // Should contain only alphanumeric characters
    assert!(verifier.chars().all(|c| c.is_ascii_alphanumeric()));

    // Two generated verifiers should be different
    let verifier2 = generate_code_verifier();
    assert_ne!(verifier, verifier2);
}

#[test]
fn test_generate_code_challenge() {
    let verifier = "test_verifier_123";
    let challenge = generate_code_challenge(verifier);

    assert!(!challenge.is_empty());

    // Deterministic
    assert_eq!(challenge, generate_code_challenge(verifier));
    assert_ne!(challenge, generate_code_challenge("different_verifier"));

    // URL-safe base64, no padding
    assert!(
        challenge
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    );
}

#[test]
fn test_generate_code_challenge_known_value() {
    // RFC 7636 appendix B
    let challenge = generate_code_challenge("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk");
    assert_eq!(challenge, "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM");
}

#[test]
fn test_parse_chat_ids_valid_inputs() {
    assert_eq!(parse_chat_ids("42").unwrap(), vec![42]);
    assert_eq!(
        parse_chat_ids("-1001234567890, 42").unwrap(),
        vec![-1001234567890, 42]
    );

    // Trailing commas and blanks are tolerated
    assert_eq!(parse_chat_ids(" 1,,2, ").unwrap(), vec![1, 2]);
}

#[test]
fn test_parse_chat_ids_invalid_inputs() {
    let result = parse_chat_ids("");
    assert!(result.unwrap_err().contains("no chat ids"));

    let result = parse_chat_ids(" , ");
    assert!(result.is_err());

    let result = parse_chat_ids("42,general");
    assert!(result.unwrap_err().contains("\"general\" is not a chat id"));
}

#[test]
fn test_parse_bool() {
    for raw in ["1", "true", "TRUE", " yes ", "on"] {
        assert_eq!(parse_bool(raw), Some(true), "{raw}");
    }
    for raw in ["0", "false", "No", "off"] {
        assert_eq!(parse_bool(raw), Some(false), "{raw}");
    }
    assert_eq!(parse_bool("maybe"), None);
    assert_eq!(parse_bool(""), None);
}

#[test]
fn test_bot_command() {
    assert_eq!(bot_command("/start"), Some("start"));
    assert_eq!(bot_command("/refresh@relay_bot now"), Some("refresh"));
    assert_eq!(bot_command("  /start"), Some("start"));

    // Ordinary messages are not commands
    assert_eq!(bot_command("open.spotify.com/track/AAA"), None);
    assert_eq!(bot_command("see /start"), None);
    assert_eq!(bot_command("/"), None);
    assert_eq!(bot_command(""), None);
}
