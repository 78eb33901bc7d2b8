use crate::cli::output::Output;
use crate::cli::ConfigAction;
use crate::errors::Result;
use crate::git::GitRepository;
use crate::stack::MetadataStore;

/// Get, set or list persisted settings
pub async fn run(action: ConfigAction) -> Result<()> {
    let repo = GitRepository::open_current()?;
    let store = MetadataStore::new(repo.path());
    let mut set = store.load()?;

    match action {
        ConfigAction::Get { key } => {
            println!("{}", set.settings.get_value(&key)?);
        }
        ConfigAction::Set { key, value } => {
            set.settings.set_value(&key, &value)?;
            store.save(&set)?;
            Output::success(format!("Set {key} = {value}"));
        }
        ConfigAction::List => {
            for (key, value) in set.settings.list_values() {
                println!("{key} = {value}");
            }
        }
    }
    Ok(())
}
