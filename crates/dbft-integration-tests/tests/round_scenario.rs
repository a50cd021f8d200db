//! End-to-end rounds across several validator contexts.

use dbft_consensus::{
    verify_header_signature, Address, ConsensusMessage, ConsensusState, Error, KeySource,
    MessageCodec, Proposal, RoundContext, RoundHandle,
};
use dbft_integration_tests::{sample_transactions, MemoryPool, TestNetwork};

fn proposal_for(pool_txs: &[dbft_consensus::Transaction], timestamp: u32) -> Proposal {
    Proposal {
        timestamp,
        nonce: 0x5eed,
        next_producer: Address([7u8; 20]),
        transaction_hashes: pool_txs.iter().map(|tx| tx.hash()).collect(),
    }
}

#[test]
fn four_validators_local_index_one() {
    dbft_logging::init_for_tests();

    // Tip at 9, so the round is for height 10 and view 0 belongs to validator 2.
    let net = TestNetwork::new(4, 9);
    let mut ctx = net.context(1);
    assert_eq!(ctx.local_index(), Some(1));
    assert_eq!(ctx.primary_index(), 10 % 4);

    let txs = sample_transactions(3);
    ctx.adopt_proposal(proposal_for(&txs, 100)).unwrap();
    assert!(!ctx.all_hashes_resolved());
    assert!(matches!(
        ctx.build_proposal_message(),
        Err(Error::NotPrimary { local: 1, primary: 2 })
    ));

    // View 1 hands the proposal to validator 1.
    ctx.change_view(1).unwrap();
    assert!(ctx.is_primary());
    assert!(ctx.transaction_hashes().is_none());

    let mut pool = MemoryPool::default();
    for tx in &txs {
        pool.insert(tx.clone());
    }
    ctx.adopt_proposal(proposal_for(&txs, 101)).unwrap();
    assert_eq!(ctx.resolve_from(&pool).unwrap(), 3);
    assert!(ctx.all_hashes_resolved());
    assert_eq!(ctx.resolved_transactions(), txs.as_slice());

    let signature = ctx.sign_header(&net.keys[1]).unwrap();
    let payload = ctx.build_proposal_message().unwrap();
    assert_eq!(payload.validator_index, 1);
    assert_eq!(payload.height, 10);
    match payload.message {
        ConsensusMessage::PrepareRequest(req) => {
            assert_eq!(req.view_number, 1);
            assert_eq!(req.nonce, 0x5eed);
            assert_eq!(req.next_producer, Address([7u8; 20]));
            assert_eq!(req.transaction_hashes, txs.iter().map(|t| t.hash()).collect::<Vec<_>>());
            assert_eq!(req.signature, signature);
        }
        other => panic!("expected a prepare request, got {:?}", other),
    }
}

#[test]
fn full_round_reaches_agreement() {
    dbft_logging::init_for_tests();

    let mut net = TestNetwork::new(4, 20);
    let mut contexts = net.contexts();
    let primary = contexts[0].primary_index();
    assert_eq!(primary, 21 % 4);

    let txs = sample_transactions(5);
    let mut pool = MemoryPool::default();
    for tx in &txs {
        pool.insert(tx.clone());
    }

    // Primary proposes and seals.
    contexts[primary]
        .adopt_proposal(proposal_for(&txs, 1_700_000_000))
        .unwrap();
    contexts[primary].resolve_from(&pool).unwrap();
    contexts[primary].sign_header(&net.keys[primary]).unwrap();
    contexts[primary].mark_signature_sent();
    let sealed = net.keys[primary]
        .seal(&contexts[primary].build_proposal_message().unwrap())
        .unwrap();

    // Backups open it, rebuild the header and answer.
    let mut responses = Vec::new();
    for (index, ctx) in contexts.iter_mut().enumerate() {
        if index == primary {
            continue;
        }
        let payload = sealed.open().unwrap();
        assert_eq!(sealed.signer, ctx.validators()[payload.validator_index as usize]);
        let ConsensusMessage::PrepareRequest(request) = payload.message else {
            panic!("expected a prepare request");
        };

        ctx.adopt_proposal(Proposal {
            timestamp: payload.timestamp,
            nonce: request.nonce,
            next_producer: request.next_producer,
            transaction_hashes: request.transaction_hashes.clone(),
        })
        .unwrap();
        ctx.set_signature(payload.validator_index as usize, request.signature.clone())
            .unwrap();
        ctx.resolve_from(&pool).unwrap();
        assert!(ctx.all_hashes_resolved());

        let header = ctx.block_header().unwrap().clone();
        assert!(verify_header_signature(&ctx.validators()[primary], &header, &request.signature));

        let own = ctx.sign_header(&net.keys[index]).unwrap();
        ctx.mark_signature_sent();
        assert!(ctx
            .state()
            .contains(ConsensusState::PRIMARY_PROPOSED | ConsensusState::SIGNATURE_SENT));
        let response = net.keys[index]
            .seal(&ctx.build_response_message(own).unwrap())
            .unwrap();
        responses.push(response);
    }

    // Primary collects two responses: 3 of 4 signatures is quorum.
    for sealed in responses.iter().take(2) {
        let payload = sealed.open().unwrap();
        let ConsensusMessage::PrepareResponse(response) = payload.message else {
            panic!("expected a prepare response");
        };
        let header = contexts[primary].block_header().unwrap().clone();
        let sender = payload.validator_index as usize;
        assert!(verify_header_signature(
            &contexts[primary].validators()[sender],
            &header,
            &response.signature
        ));
        contexts[primary].set_signature(sender, response.signature).unwrap();
    }
    assert!(contexts[primary].has_signature_quorum());

    let block = contexts[primary].finalize_block().unwrap();
    assert_eq!(block.transactions, txs);
    assert_eq!(block.header.height, 21);
    assert!(contexts[primary]
        .state()
        .contains(ConsensusState::BLOCK_ACCEPTED));

    // Every backup computed the same header.
    for ctx in &contexts {
        assert_eq!(ctx.block_header().unwrap().hash(), block.hash());
    }

    // Next height starts clean.
    net.chain.push_block(block.hash());
    let ctx = &mut contexts[primary];
    ctx.reset(&net.chain, &net.keys[primary]).unwrap();
    assert_eq!(ctx.height(), 22);
    assert_eq!(ctx.prev_hash(), block.hash());
    assert_eq!(ctx.signature_count(), 0);
    assert!(ctx.transaction_hashes().is_none());
}

#[test]
fn view_change_by_quorum() {
    dbft_logging::init_for_tests();

    let net = TestNetwork::new(4, 0);
    let mut contexts = net.contexts();
    let old_primary = contexts[0].primary_index();

    // Three validators give up on the silent primary.
    let mut announcements = Vec::new();
    for (index, ctx) in contexts.iter_mut().enumerate() {
        if index == old_primary {
            continue;
        }
        assert_eq!(ctx.request_view_change().unwrap(), 1);
        let message = ctx.build_change_view_message().unwrap();
        announcements.push(net.keys[index].seal(&message).unwrap());
    }

    for ctx in contexts.iter_mut() {
        for sealed in &announcements {
            let payload = sealed.open().unwrap();
            let ConsensusMessage::ChangeView(change) = payload.message else {
                panic!("expected a change view");
            };
            ctx.set_expected_view(payload.validator_index as usize, change.new_view_number)
                .unwrap();
        }
        assert!(ctx.has_view_change_quorum(1));
        ctx.change_view(1).unwrap();
        assert_eq!(ctx.signature_count(), 0);
        assert!(!ctx.state().contains(ConsensusState::VIEW_CHANGING));
    }

    let new_primary = contexts[0].primary_index();
    assert_ne!(new_primary, old_primary);
    assert!(contexts.iter().all(|c| c.primary_index() == new_primary));
    assert!(contexts[new_primary].is_primary());
}

#[test]
fn non_validator_cannot_send() {
    let net = TestNetwork::new(4, 3);
    let outsider = dbft_consensus::LocalValidatorKey::from_seed([200u8; 32]);
    let mut ctx = RoundContext::default();
    ctx.reset(&net.chain, &outsider).unwrap();

    assert_eq!(ctx.local_index(), None);
    assert!(matches!(ctx.build_proposal_message(), Err(Error::NotAValidator)));
    assert!(matches!(ctx.build_change_view_message(), Err(Error::NotAValidator)));
    assert!(matches!(
        ctx.build_response_message(outsider.sign(b"x")),
        Err(Error::NotAValidator)
    ));
    assert!(matches!(ctx.request_view_change(), Err(Error::NotAValidator)));
}

#[tokio::test]
async fn handle_serializes_message_and_timer_paths() {
    let net = TestNetwork::new(4, 9);
    let handle = RoundHandle::new(net.context(1));
    let txs = sample_transactions(2);

    let timer = {
        let handle = handle.clone();
        tokio::spawn(async move { handle.write(|ctx| ctx.request_view_change()).await })
    };
    let message = {
        let handle = handle.clone();
        let proposal = proposal_for(&txs, 5);
        tokio::spawn(async move { handle.write(|ctx| ctx.adopt_proposal(proposal)).await })
    };

    assert_eq!(timer.await.unwrap().unwrap(), 1);
    message.await.unwrap().unwrap();

    let (view_changing, proposed) = handle
        .read(|ctx| {
            (
                ctx.state().contains(ConsensusState::VIEW_CHANGING),
                ctx.state().contains(ConsensusState::PRIMARY_PROPOSED),
            )
        })
        .await;
    assert!(view_changing && proposed);
    tracing::debug!("handle test done");
}
