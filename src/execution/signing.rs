//! Bundle assembly: decode, tip, re-hash, sign and encode
//!
//! Transactions arrive from the build service unsigned and base64 encoded.
//! Every transaction of a bundle is stamped with the same recent blockhash,
//! the relay tip is spliced into the last one as a system transfer, and each
//! is signed by the wallet before being re-encoded as base58 for the relay.
//!
//! The tip is added at the compiled-message level so the same code path
//! serves legacy and v0 messages. Account indices are rewritten in place;
//! the order of the existing keys is preserved.

use base64::Engine;
use log::debug;
use solana_sdk::hash::Hash;
use solana_sdk::instruction::CompiledInstruction;
use solana_sdk::message::{MessageHeader, VersionedMessage};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Keypair;
use solana_sdk::signer::Signer;
use solana_sdk::transaction::VersionedTransaction;

use crate::errors::{Error, Result};
use crate::helpers::system_program_id;

use super::types::{SignedBundle, Tip};

/// Account indices are a single byte
const MAX_ACCOUNT_KEYS: usize = 256;

/// `SystemInstruction::Transfer` discriminant
const SYSTEM_TRANSFER: u32 = 2;

/// Decode an unsigned base64 wire transaction.
///
/// The message must be well formed: header counts within the key list and
/// every instruction index pointing at an account.
pub fn decode_transaction(blob: &str) -> Result<VersionedTransaction> {
    let bytes = base64::engine::general_purpose::STANDARD.decode(blob.trim())?;
    let tx: VersionedTransaction = bincode::deserialize(&bytes)?;
    tx.message
        .sanitize()
        .map_err(|e| Error::Decode(format!("malformed message: {}", e)))?;
    Ok(tx)
}

/// Base58 wire encoding expected by the relay
pub fn encode_transaction(tx: &VersionedTransaction) -> Result<String> {
    let bytes = bincode::serialize(tx)?;
    Ok(bs58::encode(bytes).into_string())
}

pub fn set_blockhash(message: &mut VersionedMessage, blockhash: Hash) {
    match message {
        VersionedMessage::Legacy(m) => m.recent_blockhash = blockhash,
        VersionedMessage::V0(m) => m.recent_blockhash = blockhash,
    }
}

/// Sign `message` with the wallet as sole signer
pub fn sign_message(message: VersionedMessage, keypair: &Keypair) -> Result<VersionedTransaction> {
    Ok(VersionedTransaction::try_new(message, &[keypair])?)
}

/// Mutable view over the parts of a compiled message the tip touches
struct CompiledParts<'a> {
    header: &'a mut MessageHeader,
    keys: &'a mut Vec<Pubkey>,
    instructions: &'a mut Vec<CompiledInstruction>,
    /// Accounts loaded through address lookup tables
    loaded: usize,
}

impl<'a> CompiledParts<'a> {
    fn of(message: &'a mut VersionedMessage) -> Self {
        match message {
            VersionedMessage::Legacy(m) => CompiledParts {
                header: &mut m.header,
                keys: &mut m.account_keys,
                instructions: &mut m.instructions,
                loaded: 0,
            },
            VersionedMessage::V0(m) => {
                let loaded = m
                    .address_table_lookups
                    .iter()
                    .map(|l| l.writable_indexes.len() + l.readonly_indexes.len())
                    .sum();
                CompiledParts {
                    header: &mut m.header,
                    keys: &mut m.account_keys,
                    instructions: &mut m.instructions,
                    loaded,
                }
            }
        }
    }

    fn is_writable(&self, index: usize) -> bool {
        let signed = self.header.num_required_signatures as usize;
        if index < signed {
            index < signed.saturating_sub(self.header.num_readonly_signed_accounts as usize)
        } else {
            index < self.keys.len().saturating_sub(self.header.num_readonly_unsigned_accounts as usize)
        }
    }

    /// Bump every account/program index at or above `from`
    fn shift_indices(&mut self, from: usize) -> Result<()> {
        fn bump(index: &mut u8, from: usize) -> Result<()> {
            if *index as usize >= from {
                *index = index
                    .checked_add(1)
                    .ok_or_else(|| Error::Decode(format!("account index {} cannot be shifted", index)))?;
            }
            Ok(())
        }

        for ix in self.instructions.iter_mut() {
            bump(&mut ix.program_id_index, from)?;
            for account in ix.accounts.iter_mut() {
                bump(account, from)?;
            }
        }
        Ok(())
    }

    fn position(&self, key: &Pubkey) -> Option<usize> {
        self.keys.iter().position(|k| k == key)
    }

    /// Index of `account` as a writable non-signer, inserting it if absent
    fn writable_account(&mut self, account: &Pubkey) -> Result<usize> {
        if let Some(index) = self.position(account) {
            if !self.is_writable(index) {
                return Err(Error::Signing(format!("tip account {} is read-only in message", account)));
            }
            return Ok(index);
        }
        let at = self
            .keys
            .len()
            .checked_sub(self.header.num_readonly_unsigned_accounts as usize)
            .filter(|at| *at >= self.header.num_required_signatures as usize)
            .ok_or_else(|| Error::Decode("message header does not match its account keys".into()))?;
        self.shift_indices(at)?;
        self.keys.insert(at, *account);
        Ok(at)
    }

    /// Index of `program`, appending it as a read-only non-signer if absent
    fn program(&mut self, program: &Pubkey) -> Result<usize> {
        if let Some(index) = self.position(program) {
            return Ok(index);
        }
        let readonly = self
            .header
            .num_readonly_unsigned_accounts
            .checked_add(1)
            .ok_or_else(|| Error::Decode("too many read-only accounts in message".into()))?;
        let at = self.keys.len();
        self.shift_indices(at)?;
        self.keys.push(*program);
        self.header.num_readonly_unsigned_accounts = readonly;
        Ok(at)
    }
}

fn transfer_data(lamports: u64) -> Vec<u8> {
    let mut data = Vec::with_capacity(12);
    data.extend_from_slice(&SYSTEM_TRANSFER.to_le_bytes());
    data.extend_from_slice(&lamports.to_le_bytes());
    data
}

/// Append a system transfer of `tip.lamports` from `payer` to `tip.account`
pub fn append_tip(message: &mut VersionedMessage, payer: &Pubkey, tip: &Tip) -> Result<()> {
    let mut parts = CompiledParts::of(message);

    if parts.header.num_required_signatures == 0 || parts.keys.first() != Some(payer) {
        return Err(Error::Signing(format!("fee payer of message is not {}", payer)));
    }

    let system = system_program_id();
    let needed = [&tip.account, &system]
        .iter()
        .filter(|k| parts.position(k).is_none())
        .count();
    if parts.keys.len() + parts.loaded + needed > MAX_ACCOUNT_KEYS {
        return Err(Error::Signing("no room for tip accounts in message".into()));
    }

    let tip_index = parts.writable_account(&tip.account)?;
    let system_index = parts.program(&system)?;

    parts.instructions.push(CompiledInstruction {
        program_id_index: system_index as u8,
        accounts: vec![0, tip_index as u8],
        data: transfer_data(tip.lamports),
    });
    Ok(())
}

/// Turn unsigned build-service transactions into one signed bundle.
///
/// All transactions get `blockhash`; only the last carries the tip. The relay
/// needs one tip per bundle, so earlier transactions are left untipped
/// instead of paying the tip once per transaction.
pub fn sign_bundle(
    blobs: &[String],
    keypair: &Keypair,
    blockhash: Hash,
    tip: Option<Tip>,
) -> Result<SignedBundle> {
    let payer = keypair.pubkey();
    let last = blobs.len().saturating_sub(1);
    let mut transactions = Vec::with_capacity(blobs.len());
    let mut signatures = Vec::with_capacity(blobs.len());

    for (i, blob) in blobs.iter().enumerate() {
        let mut message = decode_transaction(blob)?.message;
        set_blockhash(&mut message, blockhash);
        if i == last {
            if let Some(tip) = &tip {
                append_tip(&mut message, &payer, tip)?;
            }
        }
        let tx = sign_message(message, keypair)?;
        let signature = tx
            .signatures
            .first()
            .copied()
            .ok_or_else(|| Error::Signing("transaction produced no signature".into()))?;
        debug!("Signed transaction {}/{}: {}", i + 1, blobs.len(), signature);
        signatures.push(signature);
        transactions.push(encode_transaction(&tx)?);
    }

    Ok(SignedBundle {
        blockhash,
        transactions,
        signatures,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use solana_sdk::instruction::{AccountMeta, Instruction};
    use solana_sdk::message::v0::{self, MessageAddressTableLookup};
    use solana_sdk::message::Message;
    use solana_sdk::signature::Signature;
    use solana_sdk::transaction::Transaction;

    fn swap_instruction(payer: &Pubkey, program: &Pubkey, other: &Pubkey) -> Instruction {
        Instruction::new_with_bytes(
            *program,
            &[9, 1, 2, 3],
            vec![AccountMeta::new(*payer, true), AccountMeta::new(*other, false)],
        )
    }

    /// Unsigned legacy transaction, base64 encoded as the build service returns it
    pub(crate) fn unsigned_blob(payer: &Pubkey) -> String {
        let ix = swap_instruction(payer, &Pubkey::new_unique(), &Pubkey::new_unique());
        let tx = Transaction::new_unsigned(Message::new(&[ix], Some(payer)));
        let bytes = bincode::serialize(&VersionedTransaction::from(tx)).unwrap();
        base64::engine::general_purpose::STANDARD.encode(bytes)
    }

    fn decode_signed(encoded: &str) -> VersionedTransaction {
        let bytes = bs58::decode(encoded).into_vec().unwrap();
        bincode::deserialize(&bytes).unwrap()
    }

    fn resolve(message: &VersionedMessage, ix: &CompiledInstruction) -> (Pubkey, Vec<Pubkey>) {
        let keys = message.static_account_keys();
        (
            keys[ix.program_id_index as usize],
            ix.accounts.iter().map(|i| keys[*i as usize]).collect(),
        )
    }

    #[test]
    fn test_decode_round_trip() {
        let payer = Pubkey::new_unique();
        let tx = decode_transaction(&unsigned_blob(&payer)).unwrap();
        assert_eq!(tx.message.static_account_keys()[0], payer);
        assert_eq!(tx.signatures, vec![Signature::default()]);
        assert!(decode_transaction("%%%").is_err());
    }

    #[test]
    fn test_append_tip_legacy() {
        let payer = Pubkey::new_unique();
        let program = Pubkey::new_unique();
        let other = Pubkey::new_unique();
        let ix = swap_instruction(&payer, &program, &other);
        let mut message = VersionedMessage::Legacy(Message::new(&[ix], Some(&payer)));
        let before = resolve(&message, &message.instructions()[0].clone());

        let tip = Tip { account: Pubkey::new_unique(), lamports: 20_000_000 };
        append_tip(&mut message, &payer, &tip).unwrap();

        // original instruction still references the same accounts
        assert_eq!(resolve(&message, &message.instructions()[0].clone()), before);

        let transfer = message.instructions().last().unwrap().clone();
        let (program_id, accounts) = resolve(&message, &transfer);
        assert_eq!(program_id, system_program_id());
        assert_eq!(accounts, vec![payer, tip.account]);
        assert_eq!(transfer.data, transfer_data(20_000_000));
        assert_eq!(&transfer.data[..4], &[2, 0, 0, 0]);

        // tip lands among the writable non-signers, the program among the read-only ones
        let keys = message.static_account_keys();
        let readonly_from = keys.len() - message.header().num_readonly_unsigned_accounts as usize;
        let tip_index = keys.iter().position(|k| *k == tip.account).unwrap();
        assert!(tip_index >= message.header().num_required_signatures as usize);
        assert!(tip_index < readonly_from);
        assert!(transfer.program_id_index as usize >= readonly_from);
    }

    #[test]
    fn test_append_tip_v0_shifts_lookup_indices() {
        let payer = Pubkey::new_unique();
        let program = Pubkey::new_unique();
        // account index 2 refers to the first address loaded from the table
        let mut message = VersionedMessage::V0(v0::Message {
            header: MessageHeader {
                num_required_signatures: 1,
                num_readonly_signed_accounts: 0,
                num_readonly_unsigned_accounts: 1,
            },
            account_keys: vec![payer, program],
            recent_blockhash: Hash::new_unique(),
            instructions: vec![CompiledInstruction {
                program_id_index: 1,
                accounts: vec![0, 2],
                data: vec![7],
            }],
            address_table_lookups: vec![MessageAddressTableLookup {
                account_key: Pubkey::new_unique(),
                writable_indexes: vec![4],
                readonly_indexes: vec![],
            }],
        });

        let tip = Tip { account: Pubkey::new_unique(), lamports: 1 };
        append_tip(&mut message, &payer, &tip).unwrap();

        let keys = message.static_account_keys().to_vec();
        assert_eq!(keys, vec![payer, tip.account, program, system_program_id()]);
        let original = &message.instructions()[0];
        assert_eq!(original.program_id_index, 2);
        // loaded account moved past the two new static keys
        assert_eq!(original.accounts, vec![0, 4]);
        let transfer = &message.instructions()[1];
        assert_eq!(transfer.program_id_index, 3);
        assert_eq!(transfer.accounts, vec![0, 1]);
        assert_eq!(message.header().num_readonly_unsigned_accounts, 2);
    }

    #[test]
    fn test_existing_system_program_reused() {
        let payer = Pubkey::new_unique();
        let ix = Instruction::new_with_bytes(
            system_program_id(),
            &transfer_data(5),
            vec![AccountMeta::new(payer, true), AccountMeta::new(Pubkey::new_unique(), false)],
        );
        let mut message = VersionedMessage::Legacy(Message::new(&[ix], Some(&payer)));
        let key_count = message.static_account_keys().len();

        append_tip(&mut message, &payer, &Tip { account: Pubkey::new_unique(), lamports: 5 }).unwrap();
        assert_eq!(message.static_account_keys().len(), key_count + 1);
        let instructions = message.instructions();
        assert_eq!(instructions[0].program_id_index, instructions[1].program_id_index);
    }

    #[test]
    fn test_read_only_tip_account_rejected() {
        let payer = Pubkey::new_unique();
        let readonly = Pubkey::new_unique();
        let ix = Instruction::new_with_bytes(
            Pubkey::new_unique(),
            &[],
            vec![AccountMeta::new(payer, true), AccountMeta::new_readonly(readonly, false)],
        );
        let mut message = VersionedMessage::Legacy(Message::new(&[ix], Some(&payer)));
        let result = append_tip(&mut message, &payer, &Tip { account: readonly, lamports: 1 });
        assert!(matches!(result, Err(Error::Signing(_))));
    }

    fn overstated_header(payer: &Pubkey) -> Message {
        let ix = swap_instruction(payer, &Pubkey::new_unique(), &Pubkey::new_unique());
        let mut message = Message::new(&[ix], Some(payer));
        message.header.num_readonly_unsigned_accounts = 9;
        message
    }

    #[test]
    fn test_append_tip_rejects_overstated_header() {
        let payer = Pubkey::new_unique();
        let mut message = VersionedMessage::Legacy(overstated_header(&payer));
        let tip = Tip { account: Pubkey::new_unique(), lamports: 1 };
        assert!(matches!(append_tip(&mut message, &payer, &tip), Err(Error::Decode(_))));
    }

    #[test]
    fn test_append_tip_rejects_unshiftable_index() {
        let payer = Pubkey::new_unique();
        let program = Pubkey::new_unique();
        let mut message = VersionedMessage::Legacy(Message {
            header: MessageHeader {
                num_required_signatures: 1,
                num_readonly_signed_accounts: 0,
                num_readonly_unsigned_accounts: 1,
            },
            account_keys: vec![payer, program],
            recent_blockhash: Hash::new_unique(),
            instructions: vec![CompiledInstruction {
                program_id_index: 1,
                accounts: vec![0, u8::MAX],
                data: vec![],
            }],
        });
        let tip = Tip { account: Pubkey::new_unique(), lamports: 1 };
        assert!(matches!(append_tip(&mut message, &payer, &tip), Err(Error::Decode(_))));
    }

    #[test]
    fn test_malformed_build_output_is_a_decode_error() {
        let keypair = Keypair::new();
        let tx = Transaction::new_unsigned(overstated_header(&keypair.pubkey()));
        let bytes = bincode::serialize(&VersionedTransaction::from(tx)).unwrap();
        let blobs = vec![base64::engine::general_purpose::STANDARD.encode(bytes)];

        assert!(matches!(decode_transaction(&blobs[0]), Err(Error::Decode(_))));
        let tip = Tip { account: Pubkey::new_unique(), lamports: 1 };
        let result = sign_bundle(&blobs, &keypair, Hash::new_unique(), Some(tip));
        assert!(matches!(result, Err(Error::Decode(_))));
    }

    #[test]
    fn test_wrong_payer_rejected() {
        let payer = Pubkey::new_unique();
        let ix = swap_instruction(&payer, &Pubkey::new_unique(), &Pubkey::new_unique());
        let mut message = VersionedMessage::Legacy(Message::new(&[ix], Some(&payer)));
        let tip = Tip { account: Pubkey::new_unique(), lamports: 1 };
        assert!(append_tip(&mut message, &Pubkey::new_unique(), &tip).is_err());
    }

    #[test]
    fn test_sign_bundle_shares_blockhash_and_tips_last() {
        let keypair = Keypair::new();
        let payer = keypair.pubkey();
        let blobs = vec![unsigned_blob(&payer), unsigned_blob(&payer)];
        let blockhash = Hash::new_unique();
        let tip = Tip { account: Pubkey::new_unique(), lamports: 20_000_000 };

        let bundle = sign_bundle(&blobs, &keypair, blockhash, Some(tip)).unwrap();
        assert_eq!(bundle.len(), 2);
        assert_eq!(bundle.blockhash, blockhash);

        let txs: Vec<_> = bundle.transactions.iter().map(|t| decode_signed(t)).collect();
        for (tx, signature) in txs.iter().zip(&bundle.signatures) {
            assert_eq!(*tx.message.recent_blockhash(), blockhash);
            assert!(tx.verify_with_results().iter().all(|ok| *ok));
            assert_eq!(tx.signatures[0], *signature);
        }
        assert_eq!(txs[0].message.instructions().len(), 1);
        assert_eq!(txs[1].message.instructions().len(), 2);
        assert!(!txs[0].message.static_account_keys().contains(&tip.account));
        assert!(txs[1].message.static_account_keys().contains(&tip.account));
    }

    #[test]
    fn test_sign_bundle_without_tip() {
        let keypair = Keypair::new();
        let blobs = vec![unsigned_blob(&keypair.pubkey())];
        let bundle = sign_bundle(&blobs, &keypair, Hash::new_unique(), None).unwrap();
        let tx = decode_signed(&bundle.transactions[0]);
        assert_eq!(tx.message.instructions().len(), 1);
    }

    #[test]
    fn test_foreign_payer_cannot_be_signed() {
        let keypair = Keypair::new();
        let blobs = vec![unsigned_blob(&Pubkey::new_unique())];
        assert!(sign_bundle(&blobs, &keypair, Hash::new_unique(), None).is_err());
    }
}
