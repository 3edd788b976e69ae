use soroban_sdk::{
    testutils::{Address as _, Ledger},
    token::{StellarAssetClient, TokenClient},
    Address, Env, String,
};

use meme_competition::{MemeCompetition, MemeCompetitionClient, MemeStatus};

fn create_token<'a>(env: &'a Env, token_admin: &Address) -> (Address, StellarAssetClient<'a>) {
    let token_contract = env.register_stellar_asset_contract_v2(token_admin.clone());
    let token_client = StellarAssetClient::new(env, &token_contract.address());
    (token_contract.address(), token_client)
}

fn submit(
    env: &Env,
    client: &MemeCompetitionClient,
    game_id: u64,
    creator: &Address,
    name: &str,
    symbol: &str,
) -> u64 {
    client.submit_meme(
        &game_id,
        creator,
        &String::from_str(env, name),
        &String::from_str(env, "community pick"),
        &String::from_str(env, name),
        &String::from_str(env, symbol),
        &String::from_str(env, name),
        &String::from_str(env, "ipfs://meme"),
    )
}

#[test]
fn test_full_competition_pays_winner_creator() {
    let env = Env::default();

    let admin = Address::generate(&env);
    let token_admin = Address::generate(&env);
    let alice = Address::generate(&env);
    let bob = Address::generate(&env);
    let carol = Address::generate(&env);

    let (token_addr, token_sac) = create_token(&env, &token_admin);

    let competition_id = env.register(MemeCompetition, ());
    let competition = MemeCompetitionClient::new(&env, &competition_id);

    env.mock_all_auths();
    env.ledger().set_timestamp(10_000);
    competition.init(&admin, &token_addr, &1_000u64, &3u32);

    for player in [&alice, &bob, &carol] {
        token_sac.mint(player, &100i128);
    }

    let game_id = competition.create_game(&admin, &30i128, &60u64);
    competition.join_game(&game_id, &alice);
    competition.join_game(&game_id, &bob);
    competition.join_game(&game_id, &carol);

    let token = TokenClient::new(&env, &token_addr);
    assert_eq!(token.balance(&competition_id), 90);
    assert_eq!(competition.get_game_info(&game_id).prize_pool, 90);

    let cat = submit(&env, &competition, game_id, &alice, "Grumpy Cat", "GRUMP");
    let dog = submit(&env, &competition, game_id, &bob, "Doge", "DOGE");
    let frog = submit(&env, &competition, game_id, &carol, "Pepe", "PEPE");
    let spam = submit(&env, &competition, game_id, &carol, "Spam", "SPAM");

    competition.approve_meme(&admin, &game_id, &cat);
    competition.approve_meme(&admin, &game_id, &dog);
    competition.approve_meme(&admin, &game_id, &frog);
    competition.reject_meme(&admin, &game_id, &spam);
    competition.start_game(&admin, &game_id);

    // Round 0: frog trails and is cut
    competition.vote(&game_id, &alice, &cat, &600u64);
    competition.vote(&game_id, &bob, &dog, &700u64);
    competition.vote(&game_id, &carol, &frog, &500u64);
    env.ledger().set_timestamp(10_060);

    let outcome = competition.end_round(&game_id);
    assert_eq!(outcome.leading_meme_id, dog);
    assert_eq!(outcome.leading_votes, 700);
    assert_eq!(outcome.eliminated_memes, 1);
    assert_eq!(outcome.eliminated_participants, 0);
    assert!(!outcome.game_ended);

    // Round 1: carol sits out and is eliminated; cat overtakes dog
    competition.vote(&game_id, &alice, &cat, &1_000u64);
    competition.vote(&game_id, &bob, &dog, &800u64);
    env.ledger().set_timestamp(10_120);

    let outcome = competition.end_round(&game_id);
    assert_eq!(outcome.round_number, 1);
    assert_eq!(outcome.eliminated_participants, 1);
    assert!(outcome.game_ended);
    assert_eq!(outcome.winning_meme_id, cat);

    let game = competition.get_game_info(&game_id);
    assert!(!game.is_active);
    assert_eq!(game.winning_meme_id, cat);
    assert_eq!(game.remaining_participants, 2);

    assert_eq!(token.balance(&alice), 100 - 30 + 90);
    assert_eq!(token.balance(&bob), 70);
    assert_eq!(token.balance(&carol), 70);
    assert_eq!(token.balance(&competition_id), 0);

    assert_eq!(competition.get_meme_info(&cat).total_votes, 1_600);
    assert_eq!(competition.get_meme_info(&spam).status, MemeStatus::Rejected);

    let board = competition.get_leaderboard(&game_id);
    assert_eq!(board.get(0).unwrap().player, alice);
    assert_eq!(board.get(0).unwrap().score, 1_600);
    assert_eq!(board.get(1).unwrap().player, bob);
    assert_eq!(board.get(2).unwrap().player, carol);
}

#[test]
fn test_concurrent_games_keep_separate_pools() {
    let env = Env::default();

    let admin = Address::generate(&env);
    let token_admin = Address::generate(&env);
    let player = Address::generate(&env);

    let (token_addr, token_sac) = create_token(&env, &token_admin);

    let competition_id = env.register(MemeCompetition, ());
    let competition = MemeCompetitionClient::new(&env, &competition_id);

    env.mock_all_auths();
    env.ledger().set_timestamp(500);
    competition.init(&admin, &token_addr, &1_000u64, &2u32);
    token_sac.mint(&player, &1_000i128);

    let paid = competition.create_game(&admin, &250i128, &30u64);
    let free = competition.create_game(&admin, &0i128, &30u64);
    competition.join_game(&paid, &player);
    competition.join_game(&free, &player);

    let paid_meme = submit(&env, &competition, paid, &player, "Stonks", "STONK");
    let free_meme = submit(&env, &competition, free, &admin, "House", "HOUSE");
    competition.approve_meme(&admin, &paid, &paid_meme);
    competition.approve_meme(&admin, &free, &free_meme);
    competition.start_game(&admin, &paid);
    competition.start_game(&admin, &free);

    competition.vote(&paid, &player, &paid_meme, &10u64);
    competition.vote(&free, &player, &free_meme, &10u64);
    env.ledger().set_timestamp(530);

    assert!(competition.end_round(&free).game_ended);
    assert_eq!(competition.get_game_info(&paid).prize_pool, 250);

    let token = TokenClient::new(&env, &token_addr);
    assert_eq!(token.balance(&competition_id), 250);

    assert!(competition.end_round(&paid).game_ended);
    assert_eq!(token.balance(&player), 1_000);
    assert_eq!(token.balance(&competition_id), 0);
    assert_eq!(competition.get_game_count(), 2);
}
