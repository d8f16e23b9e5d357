use crate::net::ProtocolError;

/// Exchanged through `version_request`/`version_info` before login. Bump the
/// iteration whenever a signal layout changes.
pub const VERSION_ID: &str = "overnet";
pub const VERSION_ITERATION: u64 = 1;

/// Defines a `u16`-tagged signal id enum. Ids 0 and 1 are the transport's ack
/// and heartbeat and never appear here.
macro_rules! signal_ids {
    ($(#[$meta:meta])* $name:ident { $($variant:ident = $id:literal,)* }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u16)]
        pub enum $name {
            $($variant = $id,)*
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant,)*];

            pub fn id(self) -> u16 {
                self as u16
            }
        }

        impl TryFrom<u16> for $name {
            type Error = ProtocolError;

            fn try_from(value: u16) -> Result<Self, Self::Error> {
                match value {
                    $($id => Ok(Self::$variant),)*
                    other => Err(ProtocolError::UnknownSignal(other)),
                }
            }
        }
    };
}

signal_ids! {
    /// Server-to-client signal ids.
    ServerSignal {
        Authorize = 2,
        Login = 3,
        ConnectionComplete = 4,
        TransferWarp = 5,
        TransferStart = 6,
        TransferComplete = 7,
        TransferServer = 8,
        Kick = 9,
        RemoveAsset = 10,
        AssetStreamStart = 11,
        AssetStream = 12,
        Preload = 13,
        CustomEmotesPath = 14,
        MapUpdate = 15,
        Health = 16,
        BaseHealth = 17,
        Emotion = 18,
        Money = 19,
        AddItem = 20,
        RemoveItem = 21,
        PlaySound = 22,
        ExcludeObject = 23,
        IncludeObject = 24,
        ExcludeActor = 25,
        IncludeActor = 26,
        MoveCamera = 27,
        SlideCamera = 28,
        ShakeCamera = 29,
        FadeCamera = 30,
        TrackWithCamera = 31,
        UnlockCamera = 32,
        LockInput = 33,
        UnlockInput = 34,
        Teleport = 35,
        Message = 36,
        Question = 37,
        Quiz = 38,
        Prompt = 39,
        TextboxResponseAck = 40,
        OpenBoard = 41,
        PrependPosts = 42,
        AppendPosts = 43,
        RemovePost = 44,
        PostSelectionAck = 45,
        CloseBoard = 46,
        ShopInventory = 47,
        OpenShop = 48,
        LoadPackage = 49,
        PackageOffer = 50,
        ModWhitelist = 51,
        ModBlacklist = 52,
        InitiateMob = 53,
        InitiatePvp = 54,
        ActorConnected = 55,
        ActorDisconnected = 56,
        ActorSetName = 57,
        ActorMoveTo = 58,
        ActorSetAvatar = 59,
        ActorEmote = 60,
        ActorAnimate = 61,
        ActorKeyframes = 62,
        ActorMinimapColor = 63,
        SynchronizeUpdates = 64,
        EndSynchronization = 65,
        VersionInfo = 66,
    }
}

signal_ids! {
    /// Client-to-server signal ids.
    ClientSignal {
        Login = 2,
        Logout = 3,
        RequestJoin = 4,
        Ready = 5,
        Position = 6,
        AvatarChange = 7,
        AssetFound = 8,
        AssetStream = 9,
        Emote = 10,
        ObjectInteraction = 11,
        ActorInteraction = 12,
        TileInteraction = 13,
        TextboxResponse = 14,
        PromptResponse = 15,
        BoardOpen = 16,
        BoardClose = 17,
        PostRequest = 18,
        PostSelection = 19,
        ShopClose = 20,
        ShopPurchase = 21,
        BattleResults = 22,
        Authorize = 23,
        TransferredOut = 24,
        VersionRequest = 25,
    }
}
