// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deterministic hashcat argument-vector construction from [`Params`] (§4.E).

use agent_core::{AttackModeHashcat, Params};

/// Build the full hashcat argument vector for `params`.
///
/// Attack-mode-specific positional arguments come first, followed by the
/// always-present flags in the order the spec lists them. Argument order
/// otherwise doesn't matter to hashcat, but a stable order makes the
/// resulting command line reproducible and easy to assert on in tests.
pub fn build_args(params: &Params) -> Vec<String> {
    let mut args = Vec::new();

    args.push(params.hash_mode.to_string());
    args.push(path_arg(&params.hash_file));

    match params.attack_mode {
        AttackModeHashcat::Dictionary => {
            if let Some(word_list) = &params.word_list {
                args.push(path_arg(word_list));
            }
            if let Some(rule_list) = &params.rule_list {
                args.push("-r".to_string());
                args.push(path_arg(rule_list));
            }
        }
        AttackModeHashcat::Combinator => {
            // The server's attack resource model carries one `word_list`
            // slot and one `rule_list` slot; for combinator attacks the
            // second dictionary rides in `rule_list` instead of a rule
            // file (there is no dedicated "right word list" field).
            if let Some(left) = &params.word_list {
                args.push(path_arg(left));
            }
            if let Some(right) = &params.rule_list {
                args.push(path_arg(right));
            }
        }
        AttackModeHashcat::Mask => {
            if let Some(mask) = &params.mask {
                args.push(mask.clone());
            }
            if params.mask_increment {
                args.push("--increment".to_string());
                args.push(format!("--increment-min={}", params.increment_minimum));
                args.push(format!("--increment-max={}", params.increment_maximum));
            }
        }
        AttackModeHashcat::HybridDictionaryMask => {
            if let Some(word_list) = &params.word_list {
                args.push(path_arg(word_list));
            }
            if let Some(mask) = &params.mask {
                args.push(mask.clone());
            }
        }
        AttackModeHashcat::HybridMaskDictionary => {
            if let Some(mask) = &params.mask {
                args.push(mask.clone());
            }
            if let Some(word_list) = &params.word_list {
                args.push(path_arg(word_list));
            }
        }
    }

    args.push("--status".to_string());
    args.push("--status-json".to_string());
    args.push(format!("--status-timer={}", params.status_timer.as_secs()));
    args.push(format!("--session={}", params.attack_id));
    args.push(format!("--outfile={}", path_arg(&params.out_file)));
    args.push("--outfile-format=1,2".to_string());
    args.push(format!(
        "--restore-file-path={}",
        path_arg(&params.restore_file)
    ));

    for (flag, charset) in [
        ("-1", &params.custom_charset_1),
        ("-2", &params.custom_charset_2),
        ("-3", &params.custom_charset_3),
        ("-4", &params.custom_charset_4),
    ] {
        if let Some(charset) = charset {
            args.push(format!("{flag}={charset}"));
        }
    }

    if params.optimized_kernels {
        args.push("-O".to_string());
    }
    if params.slow_candidates {
        args.push("-S".to_string());
    }
    if params.skip != 0 {
        args.push(format!("--skip={}", params.skip));
    }
    if params.limit != 0 {
        args.push(format!("--limit={}", params.limit));
    }
    if let Some(devices) = &params.backend_devices {
        args.push("-d".to_string());
        args.push(devices.clone());
    }
    if let Some(devices) = &params.opencl_devices {
        args.push("-D".to_string());
        args.push(devices.clone());
    }

    args.extend(params.additional_args.iter().cloned());

    if params.attack_benchmark {
        args.push("--machine-readable".to_string());
    }

    args
}

fn path_arg(path: &std::path::Path) -> String {
    path.to_string_lossy().into_owned()
}
