//! Meme Competition Contract
//!
//! Runs meme-voting competitions. Players pay an entry fee to join a game,
//! submit memes for moderation, then spend a per-round credit budget voting
//! on approved memes across a sequence of timed rounds. The creator of the
//! meme with the most votes takes the prize pool.
//!
//! ## Game Flow
//! 1. Admin calls `create_game` with an entry fee and round duration.
//! 2. Players `join_game` (fee transferred in) and `submit_meme`.
//! 3. Admin `approve_meme`s / `reject_meme`s submissions, then `start_game`
//!    opens round 0 with every approved meme.
//! 4. Participants `vote` while the round window is open.
//! 5. Once the deadline passes anyone calls `end_round`: non-voters and the
//!    lowest-tally memes are eliminated and the next round opens, or the
//!    game ends and the prize is paid out.
//!
//! ## Storage Strategy
//! - `instance()`: Admin, Token, CreditsPerRound, MaxRounds, Paused and the
//!   game/meme id counters.
//! - `persistent()`: per-game, per-meme, per-participant and per-round
//!   entries, each bumped on write.
//!
//! ## Invariant
//! Until payout, a game's `prize_pool` equals the sum of entry fees paid by
//! its participants, and the contract's token balance covers the prize pools
//! of every active game.
#![no_std]
#![allow(unexpected_cfgs)]

use soroban_sdk::{
    contract, contracterror, contractevent, contractimpl, contracttype, token::TokenClient,
    Address, Env, IntoVal, String, Val, Vec,
};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Persistent storage TTL in ledgers (~30 days at 5 s/ledger).
/// Bumped on every write so a game's data never expires mid-round.
pub const PERSISTENT_BUMP_LEDGERS: u32 = 518_400;

// ---------------------------------------------------------------------------
// Error Types
// ---------------------------------------------------------------------------

/// Every failure a competition call can report.
///
/// A call that returns any of these is rolled back by the host, so callers
/// should treat a failure as a no-op and re-read state.
#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum Error {
    AlreadyInitialized    = 1,
    NotInitialized        = 2,
    Unauthorized          = 3,
    InvalidAmount         = 4,
    InvalidConfig         = 5,
    GameNotFound          = 6,
    MemeNotFound          = 7,
    RoundNotFound         = 8,
    ParticipantNotFound   = 9,
    InvalidState          = 10,
    AlreadyJoined         = 11,
    InsufficientFunds     = 12,
    BudgetExceeded        = 13,
    MemeNotEligible       = 14,
    RoundClosed           = 15,
    RoundStillOpen        = 16,
    ParticipantEliminated = 17,
    NoApprovedMemes       = 18,
    InvalidMemeData       = 19,
    ContractPaused        = 20,
    Overflow              = 21,
}

// ---------------------------------------------------------------------------
// Storage Types
// ---------------------------------------------------------------------------

/// Discriminants for all storage keys.
///
/// Instance keys hold contract config and id counters and share one ledger
/// entry. Persistent keys are per-game, per-meme and per-player entries,
/// each with their own TTL.
#[contracttype]
#[derive(Clone)]
pub enum DataKey {
    // --- instance() ---
    Admin,
    Token,
    CreditsPerRound,
    MaxRounds,
    Paused,
    GameCount,
    MemeCount,
    // --- persistent() ---
    Game(u64),
    Meme(u64),
    /// Every meme id submitted to a game, in submission order.
    GameMemes(u64),
    /// Every participant of a game, in join order.
    GamePlayers(u64),
    Participant(u64, Address),
    Round(u64, u32),
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GameData {
    pub game_id: u64,
    pub creator: Address,
    pub entry_fee: i128,
    /// Seconds each voting round stays open.
    pub round_duration: u64,
    /// Sum of entry fees collected. Left untouched by the payout so the
    /// awarded amount stays readable after the game ends.
    pub prize_pool: i128,
    pub start_time: u64,
    pub current_round: u32,
    pub is_active: bool,
    pub is_started: bool,
    pub total_participants: u32,
    pub remaining_participants: u32,
    /// Zero until the game ends.
    pub winning_meme_id: u64,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum MemeStatus {
    Pending = 0,
    Approved = 1,
    Rejected = 2,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MemeData {
    pub meme_id: u64,
    pub game_id: u64,
    pub creator: Address,
    pub name: String,
    pub description: String,
    pub token_name: String,
    pub token_symbol: String,
    pub unique_id: String,
    pub image_url: String,
    pub status: MemeStatus,
    /// Votes received across every round of the game.
    pub total_votes: u64,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ParticipantData {
    pub player: Address,
    /// Credits left to spend in the current round.
    pub credits: u64,
    /// Cumulative votes cast across all rounds.
    pub score: u64,
    pub is_eliminated: bool,
    pub last_voted_round: u32,
    /// Distinguishes "voted in round 0" from "never voted".
    pub has_voted: bool,
}

impl ParticipantData {
    pub fn voted_in(&self, round_number: u32) -> bool {
        self.has_voted && self.last_voted_round == round_number
    }
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RoundData {
    pub round_number: u32,
    pub start_time: u64,
    pub end_time: u64,
    /// Approved memes eligible for voting in this round.
    pub meme_ids: Vec<u64>,
    /// Per-meme tally, index-aligned with `meme_ids`.
    pub meme_votes: Vec<u64>,
    pub is_ended: bool,
}

impl RoundData {
    /// Position of `meme_id` in this round's eligible set.
    pub fn index_of(&self, meme_id: u64) -> Option<u32> {
        for i in 0..self.meme_ids.len() {
            if self.meme_ids.get_unchecked(i) == meme_id {
                return Some(i);
            }
        }
        None
    }
}

/// One leaderboard row.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ScoreEntry {
    pub player: Address,
    pub score: u64,
}

/// Summary returned by `end_round`.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RoundOutcome {
    pub round_number: u32,
    /// Meme with the highest tally in the closed round.
    pub leading_meme_id: u64,
    pub leading_votes: u64,
    pub eliminated_participants: u32,
    pub eliminated_memes: u32,
    pub game_ended: bool,
    /// Zero unless `game_ended`.
    pub winning_meme_id: u64,
}

/// Snapshot of the contract configuration returned by `get_config`.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CompetitionConfig {
    pub admin: Address,
    pub token: Address,
    pub credits_per_round: u64,
    pub max_rounds: u32,
    pub paused: bool,
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[contractevent]
pub struct Initialized {
    #[topic]
    pub admin: Address,
    pub token: Address,
    pub credits_per_round: u64,
    pub max_rounds: u32,
}

#[contractevent]
pub struct PauseChanged {
    #[topic]
    pub admin: Address,
    pub paused: bool,
}

#[contractevent]
pub struct GameCreated {
    #[topic]
    pub game_id: u64,
    #[topic]
    pub creator: Address,
    pub entry_fee: i128,
    pub round_duration: u64,
}

#[contractevent]
pub struct GameStarted {
    #[topic]
    pub game_id: u64,
    pub start_time: u64,
}

#[contractevent]
pub struct MemeSubmitted {
    #[topic]
    pub game_id: u64,
    #[topic]
    pub meme_id: u64,
    #[topic]
    pub creator: Address,
}

#[contractevent]
pub struct MemeApproved {
    #[topic]
    pub game_id: u64,
    #[topic]
    pub meme_id: u64,
}

#[contractevent]
pub struct MemeRejected {
    #[topic]
    pub game_id: u64,
    #[topic]
    pub meme_id: u64,
}

#[contractevent]
pub struct MemeEliminated {
    #[topic]
    pub game_id: u64,
    #[topic]
    pub meme_id: u64,
    pub round_number: u32,
}

#[contractevent]
pub struct UserJoined {
    #[topic]
    pub game_id: u64,
    #[topic]
    pub user: Address,
    pub entry_fee: i128,
}

#[contractevent]
pub struct RoundStarted {
    #[topic]
    pub game_id: u64,
    #[topic]
    pub round_number: u32,
    pub start_time: u64,
    pub end_time: u64,
}

#[contractevent]
pub struct RoundEnded {
    #[topic]
    pub game_id: u64,
    #[topic]
    pub round_number: u32,
    pub end_time: u64,
}

#[contractevent]
pub struct UserVoted {
    #[topic]
    pub game_id: u64,
    #[topic]
    pub round_number: u32,
    #[topic]
    pub user: Address,
    pub meme_id: u64,
    pub votes: u64,
}

#[contractevent]
pub struct UserEliminated {
    #[topic]
    pub game_id: u64,
    #[topic]
    pub user: Address,
    pub round_number: u32,
}

#[contractevent]
pub struct GameEnded {
    #[topic]
    pub game_id: u64,
    pub winning_meme_id: u64,
    pub winner: Address,
    pub prize_amount: i128,
}

// ---------------------------------------------------------------------------
// Contract
// ---------------------------------------------------------------------------

#[contract]
pub struct MemeCompetition;

#[contractimpl]
impl MemeCompetition {
    // -----------------------------------------------------------------------
    // Configuration
    // -----------------------------------------------------------------------

    /// Initialize the competition contract. May only be called once.
    ///
    /// `token` is the SEP-41 contract entry fees are paid in and prizes are
    /// paid out of. `credits_per_round` is each participant's voting budget
    /// per round; `max_rounds` caps how many rounds a game may run.
    pub fn init(
        env: Env,
        admin: Address,
        token: Address,
        credits_per_round: u64,
        max_rounds: u32,
    ) -> Result<(), Error> {
        if env.storage().instance().has(&DataKey::Admin) {
            return Err(Error::AlreadyInitialized);
        }

        admin.require_auth();

        if credits_per_round == 0 || max_rounds == 0 {
            return Err(Error::InvalidConfig);
        }

        env.storage().instance().set(&DataKey::Admin, &admin);
        env.storage().instance().set(&DataKey::Token, &token);
        env.storage()
            .instance()
            .set(&DataKey::CreditsPerRound, &credits_per_round);
        env.storage().instance().set(&DataKey::MaxRounds, &max_rounds);
        env.storage().instance().set(&DataKey::Paused, &false);
        env.storage().instance().set(&DataKey::GameCount, &0u64);
        env.storage().instance().set(&DataKey::MemeCount, &0u64);

        Initialized {
            admin,
            token,
            credits_per_round,
            max_rounds,
        }
        .publish(&env);

        Ok(())
    }

    /// Pause or resume every mutating game call. Admin only.
    pub fn set_paused(env: Env, admin: Address, paused: bool) -> Result<(), Error> {
        require_initialized(&env)?;
        require_admin(&env, &admin)?;

        env.storage().instance().set(&DataKey::Paused, &paused);

        PauseChanged { admin, paused }.publish(&env);

        Ok(())
    }

    pub fn get_config(env: Env) -> Result<CompetitionConfig, Error> {
        require_initialized(&env)?;
        Ok(CompetitionConfig {
            admin: get_admin(&env)?,
            token: get_token(&env)?,
            credits_per_round: get_credits_per_round(&env)?,
            max_rounds: get_max_rounds(&env)?,
            paused: is_paused(&env),
        })
    }

    // -----------------------------------------------------------------------
    // Admin: game setup and moderation
    // -----------------------------------------------------------------------

    /// Open a new game for joining. Returns the new game id.
    pub fn create_game(
        env: Env,
        admin: Address,
        entry_fee: i128,
        round_duration: u64,
    ) -> Result<u64, Error> {
        require_initialized(&env)?;
        ensure_not_paused(&env)?;
        require_admin(&env, &admin)?;

        if entry_fee < 0 {
            return Err(Error::InvalidAmount);
        }
        if round_duration == 0 {
            return Err(Error::InvalidConfig);
        }

        let game_id = next_id(&env, DataKey::GameCount)?;
        let game = GameData {
            game_id,
            creator: admin.clone(),
            entry_fee,
            round_duration,
            prize_pool: 0,
            start_time: 0,
            current_round: 0,
            is_active: true,
            is_started: false,
            total_participants: 0,
            remaining_participants: 0,
            winning_meme_id: 0,
        };

        set_game(&env, &game);
        set_game_memes(&env, game_id, &Vec::new(&env));
        set_game_players(&env, game_id, &Vec::new(&env));

        GameCreated {
            game_id,
            creator: admin,
            entry_fee,
            round_duration,
        }
        .publish(&env);

        Ok(game_id)
    }

    /// Approve a pending meme. If the game is already running the meme joins
    /// the current round with a zero tally, which requires that round's
    /// voting window to still be open. Between the deadline and `end_round`
    /// the call fails with `RoundClosed` and the meme stays pending, so it
    /// can be approved into the next round.
    pub fn approve_meme(env: Env, admin: Address, game_id: u64, meme_id: u64) -> Result<(), Error> {
        require_initialized(&env)?;
        ensure_not_paused(&env)?;
        require_admin(&env, &admin)?;

        let game = get_game(&env, game_id)?;
        if !game.is_active {
            return Err(Error::InvalidState);
        }

        let mut meme = get_game_meme(&env, game_id, meme_id)?;
        if meme.status != MemeStatus::Pending {
            return Err(Error::InvalidState);
        }

        if game.is_started {
            let mut round = get_round(&env, game_id, game.current_round)?;
            if env.ledger().timestamp() >= round.end_time {
                return Err(Error::RoundClosed);
            }
            round.meme_ids.push_back(meme_id);
            round.meme_votes.push_back(0);
            set_round(&env, game_id, &round);
        }

        meme.status = MemeStatus::Approved;
        set_meme(&env, &meme);

        MemeApproved { game_id, meme_id }.publish(&env);

        Ok(())
    }

    /// Permanently exclude a meme. Approved memes may only be rejected
    /// before the game starts.
    pub fn reject_meme(env: Env, admin: Address, game_id: u64, meme_id: u64) -> Result<(), Error> {
        require_initialized(&env)?;
        ensure_not_paused(&env)?;
        require_admin(&env, &admin)?;

        let game = get_game(&env, game_id)?;
        if !game.is_active {
            return Err(Error::InvalidState);
        }

        let mut meme = get_game_meme(&env, game_id, meme_id)?;
        match meme.status {
            MemeStatus::Pending => {}
            MemeStatus::Approved if !game.is_started => {}
            _ => return Err(Error::InvalidState),
        }

        meme.status = MemeStatus::Rejected;
        set_meme(&env, &meme);

        MemeRejected { game_id, meme_id }.publish(&env);

        Ok(())
    }

    /// Start the game and open round 0 with every approved meme.
    pub fn start_game(env: Env, admin: Address, game_id: u64) -> Result<(), Error> {
        require_initialized(&env)?;
        ensure_not_paused(&env)?;
        require_admin(&env, &admin)?;

        let mut game = get_game(&env, game_id)?;
        if !game.is_active || game.is_started {
            return Err(Error::InvalidState);
        }

        let mut approved = Vec::new(&env);
        for meme_id in read_game_memes(&env, game_id).iter() {
            if get_meme(&env, meme_id)?.status == MemeStatus::Approved {
                approved.push_back(meme_id);
            }
        }
        if approved.is_empty() {
            return Err(Error::NoApprovedMemes);
        }

        let now = env.ledger().timestamp();
        game.is_started = true;
        game.start_time = now;
        game.current_round = 0;

        open_round(&env, &game, 0, approved)?;
        set_game(&env, &game);

        GameStarted {
            game_id,
            start_time: now,
        }
        .publish(&env);

        Ok(())
    }

    // -----------------------------------------------------------------------
    // Participants
    // -----------------------------------------------------------------------

    /// Join a game that has not started yet, paying its entry fee into the
    /// prize pool.
    pub fn join_game(env: Env, game_id: u64, player: Address) -> Result<(), Error> {
        require_initialized(&env)?;
        ensure_not_paused(&env)?;

        player.require_auth();

        let mut game = get_game(&env, game_id)?;
        if !game.is_active || game.is_started {
            return Err(Error::InvalidState);
        }

        if has_participant(&env, game_id, &player) {
            return Err(Error::AlreadyJoined);
        }

        let token = TokenClient::new(&env, &get_token(&env)?);
        if game.entry_fee > 0 && token.balance(&player) < game.entry_fee {
            return Err(Error::InsufficientFunds);
        }

        game.prize_pool = game
            .prize_pool
            .checked_add(game.entry_fee)
            .ok_or(Error::Overflow)?;
        game.total_participants = game
            .total_participants
            .checked_add(1)
            .ok_or(Error::Overflow)?;
        game.remaining_participants = game
            .remaining_participants
            .checked_add(1)
            .ok_or(Error::Overflow)?;

        if game.entry_fee > 0 {
            token.transfer(&player, &env.current_contract_address(), &game.entry_fee);
        }

        let participant = ParticipantData {
            player: player.clone(),
            credits: get_credits_per_round(&env)?,
            score: 0,
            is_eliminated: false,
            last_voted_round: 0,
            has_voted: false,
        };
        set_participant(&env, game_id, &participant);

        let mut players = read_game_players(&env, game_id);
        players.push_back(player.clone());
        set_game_players(&env, game_id, &players);

        set_game(&env, &game);

        UserJoined {
            game_id,
            user: player,
            entry_fee: game.entry_fee,
        }
        .publish(&env);

        Ok(())
    }

    /// Submit a meme for moderation. Open to participants and the admin
    /// until the game starts. Returns the new meme id.
    #[allow(clippy::too_many_arguments)]
    pub fn submit_meme(
        env: Env,
        game_id: u64,
        creator: Address,
        name: String,
        description: String,
        token_name: String,
        token_symbol: String,
        unique_id: String,
        image_url: String,
    ) -> Result<u64, Error> {
        require_initialized(&env)?;
        ensure_not_paused(&env)?;

        creator.require_auth();

        let game = get_game(&env, game_id)?;
        if !game.is_active || game.is_started {
            return Err(Error::InvalidState);
        }

        if creator != get_admin(&env)? && !has_participant(&env, game_id, &creator) {
            return Err(Error::Unauthorized);
        }

        if name.len() == 0 || token_symbol.len() == 0 {
            return Err(Error::InvalidMemeData);
        }

        let meme_id = next_id(&env, DataKey::MemeCount)?;
        let meme = MemeData {
            meme_id,
            game_id,
            creator: creator.clone(),
            name,
            description,
            token_name,
            token_symbol,
            unique_id,
            image_url,
            status: MemeStatus::Pending,
            total_votes: 0,
        };
        set_meme(&env, &meme);

        let mut memes = read_game_memes(&env, game_id);
        memes.push_back(meme_id);
        set_game_memes(&env, game_id, &memes);

        MemeSubmitted {
            game_id,
            meme_id,
            creator,
        }
        .publish(&env);

        Ok(meme_id)
    }

    /// Spend `votes` credits of the caller's current-round budget on a meme
    /// eligible in the current round.
    pub fn vote(
        env: Env,
        game_id: u64,
        player: Address,
        meme_id: u64,
        votes: u64,
    ) -> Result<(), Error> {
        require_initialized(&env)?;
        ensure_not_paused(&env)?;

        player.require_auth();

        if votes == 0 {
            return Err(Error::InvalidAmount);
        }

        let game = get_game(&env, game_id)?;
        if !game.is_active || !game.is_started {
            return Err(Error::InvalidState);
        }

        let mut participant = get_participant(&env, game_id, &player)?;
        if participant.is_eliminated {
            return Err(Error::ParticipantEliminated);
        }

        let mut round = get_round(&env, game_id, game.current_round)?;
        if env.ledger().timestamp() >= round.end_time {
            return Err(Error::RoundClosed);
        }

        let idx = round.index_of(meme_id).ok_or(Error::MemeNotEligible)?;

        if votes > participant.credits {
            return Err(Error::BudgetExceeded);
        }

        participant.credits = participant
            .credits
            .checked_sub(votes)
            .ok_or(Error::Overflow)?;
        participant.score = participant
            .score
            .checked_add(votes)
            .ok_or(Error::Overflow)?;
        participant.last_voted_round = game.current_round;
        participant.has_voted = true;

        let tally = round
            .meme_votes
            .get_unchecked(idx)
            .checked_add(votes)
            .ok_or(Error::Overflow)?;
        round.meme_votes.set(idx, tally);

        let mut meme = get_meme(&env, meme_id)?;
        meme.total_votes = meme
            .total_votes
            .checked_add(votes)
            .ok_or(Error::Overflow)?;

        set_participant(&env, game_id, &participant);
        set_round(&env, game_id, &round);
        set_meme(&env, &meme);

        UserVoted {
            game_id,
            round_number: game.current_round,
            user: player,
            meme_id,
            votes,
        }
        .publish(&env);

        Ok(())
    }

    // -----------------------------------------------------------------------
    // Round progression
    // -----------------------------------------------------------------------

    /// Close the current round once its deadline has passed.
    ///
    /// Anyone may call this; the outcome depends only on stored state and
    /// the ledger clock. Either the next round opens with the surviving memes
    /// or the game ends and the prize pool is paid to the winner.
    pub fn end_round(env: Env, game_id: u64) -> Result<RoundOutcome, Error> {
        require_initialized(&env)?;
        ensure_not_paused(&env)?;

        let mut game = get_game(&env, game_id)?;
        if !game.is_active || !game.is_started {
            return Err(Error::InvalidState);
        }

        let round_number = game.current_round;
        let mut round = get_round(&env, game_id, round_number)?;
        if round.is_ended {
            return Err(Error::InvalidState);
        }
        let now = env.ledger().timestamp();
        if now < round.end_time {
            return Err(Error::RoundStillOpen);
        }

        let eliminated_participants = settle_participants(&env, &mut game, round_number)?;
        let cut = cut_memes(&env, game_id, &round);

        round.is_ended = true;
        set_round(&env, game_id, &round);

        RoundEnded {
            game_id,
            round_number,
            end_time: round.end_time,
        }
        .publish(&env);

        let next_round = round_number.checked_add(1).ok_or(Error::Overflow)?;
        let game_over = cut.survivors.len() <= 1
            || next_round >= get_max_rounds(&env)?
            || game.remaining_participants == 0;

        let mut winning_meme_id = 0;
        if game_over {
            let winner = pick_winner(&env, &cut.survivors)?;
            winning_meme_id = winner.meme_id;
            award_prize(&env, &mut game, &winner)?;
        } else {
            game.current_round = next_round;
            open_round(&env, &game, next_round, cut.survivors)?;
            set_game(&env, &game);
        }

        Ok(RoundOutcome {
            round_number,
            leading_meme_id: cut.leading_meme_id,
            leading_votes: cut.leading_votes,
            eliminated_participants,
            eliminated_memes: cut.eliminated.len(),
            game_ended: game_over,
            winning_meme_id,
        })
    }

    // -----------------------------------------------------------------------
    // Views
    // -----------------------------------------------------------------------

    pub fn get_game_info(env: Env, game_id: u64) -> Result<GameData, Error> {
        require_initialized(&env)?;
        get_game(&env, game_id)
    }

    pub fn get_meme_info(env: Env, meme_id: u64) -> Result<MemeData, Error> {
        require_initialized(&env)?;
        get_meme(&env, meme_id)
    }

    pub fn get_participant_info(
        env: Env,
        game_id: u64,
        user: Address,
    ) -> Result<ParticipantData, Error> {
        require_initialized(&env)?;
        get_game(&env, game_id)?;
        get_participant(&env, game_id, &user)
    }

    pub fn get_round_info(env: Env, game_id: u64, round_number: u32) -> Result<RoundData, Error> {
        require_initialized(&env)?;
        get_game(&env, game_id)?;
        get_round(&env, game_id, round_number)
    }

    /// Every participant ranked by cumulative score, highest first. Equal
    /// scores keep join order.
    pub fn get_leaderboard(env: Env, game_id: u64) -> Result<Vec<ScoreEntry>, Error> {
        require_initialized(&env)?;
        get_game(&env, game_id)?;

        let mut leaderboard: Vec<ScoreEntry> = Vec::new(&env);
        for player in read_game_players(&env, game_id).iter() {
            let participant = get_participant(&env, game_id, &player)?;
            let entry = ScoreEntry {
                player,
                score: participant.score,
            };

            // Insertion sort: place after every entry with an equal or
            // higher score.
            let mut pos = leaderboard.len();
            for i in 0..leaderboard.len() {
                if entry.score > leaderboard.get_unchecked(i).score {
                    pos = i;
                    break;
                }
            }
            if pos == leaderboard.len() {
                leaderboard.push_back(entry);
            } else {
                leaderboard.insert(pos, entry);
            }
        }

        Ok(leaderboard)
    }

    pub fn get_game_count(env: Env) -> Result<u64, Error> {
        require_initialized(&env)?;
        Ok(read_game_count(&env))
    }

    /// Every meme id submitted to the game, in submission order, whatever
    /// its moderation status.
    pub fn get_game_memes(env: Env, game_id: u64) -> Result<Vec<u64>, Error> {
        require_initialized(&env)?;
        get_game(&env, game_id)?;
        Ok(read_game_memes(&env, game_id))
    }

    pub fn get_game_players(env: Env, game_id: u64) -> Result<Vec<Address>, Error> {
        require_initialized(&env)?;
        get_game(&env, game_id)?;
        Ok(read_game_players(&env, game_id))
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn require_initialized(env: &Env) -> Result<(), Error> {
    if !env.storage().instance().has(&DataKey::Admin) {
        return Err(Error::NotInitialized);
    }
    Ok(())
}

fn ensure_not_paused(env: &Env) -> Result<(), Error> {
    if is_paused(env) {
        return Err(Error::ContractPaused);
    }
    Ok(())
}

/// Verify that `caller` is the stored admin and has signed the invocation.
fn require_admin(env: &Env, caller: &Address) -> Result<(), Error> {
    let admin = get_admin(env)?;
    caller.require_auth();
    if caller != &admin {
        return Err(Error::Unauthorized);
    }
    Ok(())
}

fn get_admin(env: &Env) -> Result<Address, Error> {
    env.storage()
        .instance()
        .get(&DataKey::Admin)
        .ok_or(Error::NotInitialized)
}

fn get_token(env: &Env) -> Result<Address, Error> {
    env.storage()
        .instance()
        .get(&DataKey::Token)
        .ok_or(Error::NotInitialized)
}

fn get_credits_per_round(env: &Env) -> Result<u64, Error> {
    env.storage()
        .instance()
        .get(&DataKey::CreditsPerRound)
        .ok_or(Error::NotInitialized)
}

fn get_max_rounds(env: &Env) -> Result<u32, Error> {
    env.storage()
        .instance()
        .get(&DataKey::MaxRounds)
        .ok_or(Error::NotInitialized)
}

fn is_paused(env: &Env) -> bool {
    env.storage()
        .instance()
        .get::<_, bool>(&DataKey::Paused)
        .unwrap_or(false)
}

/// Bump the counter stored under `key` and return the new value.
/// Ids start at 1 so that 0 can never name a real entity.
fn next_id(env: &Env, key: DataKey) -> Result<u64, Error> {
    let current: u64 = env.storage().instance().get(&key).unwrap_or(0);
    let next = current.checked_add(1).ok_or(Error::Overflow)?;
    env.storage().instance().set(&key, &next);
    Ok(next)
}

fn read_game_count(env: &Env) -> u64 {
    env.storage()
        .instance()
        .get(&DataKey::GameCount)
        .unwrap_or(0)
}

fn get_game(env: &Env, game_id: u64) -> Result<GameData, Error> {
    env.storage()
        .persistent()
        .get(&DataKey::Game(game_id))
        .ok_or(Error::GameNotFound)
}

fn set_game(env: &Env, game: &GameData) {
    set_persistent(env, DataKey::Game(game.game_id), game);
}

fn get_meme(env: &Env, meme_id: u64) -> Result<MemeData, Error> {
    env.storage()
        .persistent()
        .get(&DataKey::Meme(meme_id))
        .ok_or(Error::MemeNotFound)
}

fn set_meme(env: &Env, meme: &MemeData) {
    set_persistent(env, DataKey::Meme(meme.meme_id), meme);
}

fn get_participant(
    env: &Env,
    game_id: u64,
    player: &Address,
) -> Result<ParticipantData, Error> {
    env.storage()
        .persistent()
        .get(&DataKey::Participant(game_id, player.clone()))
        .ok_or(Error::ParticipantNotFound)
}

fn has_participant(env: &Env, game_id: u64, player: &Address) -> bool {
    env.storage()
        .persistent()
        .has(&DataKey::Participant(game_id, player.clone()))
}

fn set_participant(env: &Env, game_id: u64, participant: &ParticipantData) {
    set_persistent(
        env,
        DataKey::Participant(game_id, participant.player.clone()),
        participant,
    );
}

fn get_round(env: &Env, game_id: u64, round_number: u32) -> Result<RoundData, Error> {
    env.storage()
        .persistent()
        .get(&DataKey::Round(game_id, round_number))
        .ok_or(Error::RoundNotFound)
}

fn set_round(env: &Env, game_id: u64, round: &RoundData) {
    set_persistent(env, DataKey::Round(game_id, round.round_number), round);
}

fn read_game_memes(env: &Env, game_id: u64) -> Vec<u64> {
    env.storage()
        .persistent()
        .get(&DataKey::GameMemes(game_id))
        .unwrap_or(Vec::new(env))
}

fn set_game_memes(env: &Env, game_id: u64, memes: &Vec<u64>) {
    set_persistent(env, DataKey::GameMemes(game_id), memes);
}

fn read_game_players(env: &Env, game_id: u64) -> Vec<Address> {
    env.storage()
        .persistent()
        .get(&DataKey::GamePlayers(game_id))
        .unwrap_or(Vec::new(env))
}

fn set_game_players(env: &Env, game_id: u64, players: &Vec<Address>) {
    set_persistent(env, DataKey::GamePlayers(game_id), players);
}

/// Write a persistent entry and extend its TTL in one step.
fn set_persistent<T>(env: &Env, key: DataKey, value: &T)
where
    T: IntoVal<Env, Val>,
{
    env.storage().persistent().set(&key, value);
    env.storage()
        .persistent()
        .extend_ttl(&key, PERSISTENT_BUMP_LEDGERS, PERSISTENT_BUMP_LEDGERS);
}

/// Load a meme and check it was submitted to `game_id`.
fn get_game_meme(env: &Env, game_id: u64, meme_id: u64) -> Result<MemeData, Error> {
    let meme = get_meme(env, meme_id)?;
    if meme.game_id != game_id {
        return Err(Error::MemeNotFound);
    }
    Ok(meme)
}

/// Store a fresh round starting now with a zero tally for every meme.
fn open_round(
    env: &Env,
    game: &GameData,
    round_number: u32,
    meme_ids: Vec<u64>,
) -> Result<(), Error> {
    let start_time = env.ledger().timestamp();
    let end_time = start_time
        .checked_add(game.round_duration)
        .ok_or(Error::Overflow)?;

    let mut meme_votes = Vec::new(env);
    for _ in 0..meme_ids.len() {
        meme_votes.push_back(0u64);
    }

    let round = RoundData {
        round_number,
        start_time,
        end_time,
        meme_ids,
        meme_votes,
        is_ended: false,
    };
    set_round(env, game.game_id, &round);

    RoundStarted {
        game_id: game.game_id,
        round_number,
        start_time,
        end_time,
    }
    .publish(env);

    Ok(())
}

// ---------------------------------------------------------------------------
// Settlement
// ---------------------------------------------------------------------------

// Closing a round eliminates participants who sat it out and the memes tied
// for the lowest tally. Once the game is over the surviving meme with the
// most cumulative votes takes the whole prize pool.

/// Result of ranking the memes of a closed round by their round tally.
struct MemeCut {
    leading_meme_id: u64,
    leading_votes: u64,
    survivors: Vec<u64>,
    eliminated: Vec<u64>,
}

/// Eliminate every active participant who did not vote in `round_number`
/// and refresh the credit budget of everyone who did.
///
/// Returns the number of participants eliminated.
fn settle_participants(
    env: &Env,
    game: &mut GameData,
    round_number: u32,
) -> Result<u32, Error> {
    let credits_per_round = get_credits_per_round(env)?;
    let mut eliminated = 0u32;

    for player in read_game_players(env, game.game_id).iter() {
        let mut participant = get_participant(env, game.game_id, &player)?;
        if participant.is_eliminated {
            continue;
        }

        if participant.voted_in(round_number) {
            participant.credits = credits_per_round;
        } else {
            participant.is_eliminated = true;
            game.remaining_participants = game
                .remaining_participants
                .checked_sub(1)
                .ok_or(Error::Overflow)?;
            eliminated = eliminated.checked_add(1).ok_or(Error::Overflow)?;

            UserEliminated {
                game_id: game.game_id,
                user: player.clone(),
                round_number,
            }
            .publish(env);
        }

        set_participant(env, game.game_id, &participant);
    }

    Ok(eliminated)
}

/// Split a closed round's memes into survivors and eliminated.
///
/// Every meme sharing the minimum tally is eliminated, except when all
/// memes are tied, in which case nobody is. The leader is the first meme
/// in round order holding the maximum tally.
fn cut_memes(env: &Env, game_id: u64, round: &RoundData) -> MemeCut {
    let mut cut = MemeCut {
        leading_meme_id: 0,
        leading_votes: 0,
        survivors: Vec::new(env),
        eliminated: Vec::new(env),
    };

    if round.meme_ids.is_empty() {
        return cut;
    }

    let mut min_votes = u64::MAX;
    for i in 0..round.meme_ids.len() {
        let votes = round.meme_votes.get_unchecked(i);
        if cut.leading_meme_id == 0 || votes > cut.leading_votes {
            cut.leading_meme_id = round.meme_ids.get_unchecked(i);
            cut.leading_votes = votes;
        }
        if votes < min_votes {
            min_votes = votes;
        }
    }

    let all_tied = min_votes == cut.leading_votes;
    for i in 0..round.meme_ids.len() {
        let meme_id = round.meme_ids.get_unchecked(i);
        if all_tied || round.meme_votes.get_unchecked(i) > min_votes {
            cut.survivors.push_back(meme_id);
        } else {
            cut.eliminated.push_back(meme_id);
            MemeEliminated {
                game_id,
                meme_id,
                round_number: round.round_number,
            }
            .publish(env);
        }
    }

    cut
}

/// The meme with the highest cumulative `total_votes` among the memes that
/// survived the final round. Ties go to the meme listed first.
fn pick_winner(env: &Env, survivors: &Vec<u64>) -> Result<MemeData, Error> {
    let mut winner: Option<MemeData> = None;
    for meme_id in survivors.iter() {
        let meme = get_meme(env, meme_id)?;
        let leads = match &winner {
            Some(best) => meme.total_votes > best.total_votes,
            None => true,
        };
        if leads {
            winner = Some(meme);
        }
    }
    winner.ok_or(Error::NoApprovedMemes)
}

/// Close the game and transfer the whole prize pool to the creator of the
/// winning meme.
///
/// All game state is written before the external token transfer.
fn award_prize(env: &Env, game: &mut GameData, winner: &MemeData) -> Result<(), Error> {
    game.is_active = false;
    game.winning_meme_id = winner.meme_id;
    set_game(env, game);

    if game.prize_pool > 0 {
        let token = get_token(env)?;
        TokenClient::new(env, &token).transfer(
            &env.current_contract_address(),
            &winner.creator,
            &game.prize_pool,
        );
    }

    GameEnded {
        game_id: game.game_id,
        winning_meme_id: winner.meme_id,
        winner: winner.creator.clone(),
        prize_amount: game.prize_pool,
    }
    .publish(env);

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
